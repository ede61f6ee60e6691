//! Core traits for interchangeable synchronization strategies
//!
//! This module defines the trait abstractions that let the lock-based and
//! lock-free counter implementations be used interchangeably.

/// Shared integer counter
///
/// Every method takes `&self`: implementations synchronize internally so a
/// single instance can be shared across threads behind an `Arc`.
pub trait Counter: Send + Sync {
    /// Add one to the counter
    fn increment(&self);

    /// Subtract one from the counter
    fn decrement(&self);

    /// Read the current value
    fn value(&self) -> i64;
}
