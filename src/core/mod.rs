//! Core shared-state primitives
//!
//! This module contains the concurrency building blocks:
//! - `traits` - Trait abstractions for interchangeable counter implementations
//! - `counter` - Mutex, atomic and deliberately unsynchronized counters
//! - `kv_store` - Read/write-locked key/value store
//! - `lazy` - Exactly-once lazy initialization
//! - `ledger` - Account ledger with deadlock-free transfers
//! - `worker_pool` - Bounded thread worker pool
//! - `async` - tokio counterpart of the worker pool

pub mod counter;
pub mod kv_store;
pub mod lazy;
pub mod ledger;
pub mod r#async;
pub mod traits;
pub mod worker_pool;

pub use counter::{AtomicCounter, MutexCounter, RacyCounter};
pub use kv_store::SharedKeyValueStore;
pub use lazy::{InitPhase, LazyInitializer};
pub use ledger::Ledger;
pub use r#async::AsyncWorkerPool;
pub use traits::Counter;
pub use worker_pool::{PoolConfig, WorkerPool};
