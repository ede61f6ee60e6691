//! Shared counter implementations
//!
//! Three strategies implement [`Counter`]:
//!
//! - [`MutexCounter`]: read-modify-write inside a mutex critical section
//! - [`AtomicCounter`]: a single hardware `fetch_add`/`fetch_sub`
//! - [`RacyCounter`]: a split load/store with no critical section
//!
//! The first two guarantee that the final value equals the net sum of every
//! increment and decrement issued. `RacyCounter` reproduces the lost-update
//! race without undefined behavior: concurrent updates can overwrite each
//! other, so after G actors each issue M increments it only promises a value
//! of at most G×M.

use super::traits::Counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// Counter guarded by a mutex
#[derive(Debug, Default)]
pub struct MutexCounter {
    value: Mutex<i64>,
}

impl MutexCounter {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for MutexCounter {
    fn increment(&self) {
        *self.value.lock() += 1;
    }

    fn decrement(&self) {
        *self.value.lock() -= 1;
    }

    fn value(&self) -> i64 {
        *self.value.lock()
    }
}

/// Counter backed by an atomic integer
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicI64,
}

impl AtomicCounter {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for AtomicCounter {
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    // Relaxed is enough: callers observe the final value after joining the
    // updating threads, and join synchronizes.
    fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Unsynchronized counter
///
/// Each update loads the value, yields, and stores the incremented copy.
/// Another thread may store in between, and that update is lost.
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicI64,
}

impl RacyCounter {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, delta: i64) {
        let current = self.value.load(Ordering::Relaxed);
        std::thread::yield_now();
        self.value.store(current + delta, Ordering::Relaxed);
    }
}

impl Counter for RacyCounter {
    fn increment(&self) {
        self.apply(1);
    }

    fn decrement(&self) {
        self.apply(-1);
    }

    fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}
