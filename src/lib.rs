//! Rust Shared State Library
//! # Overview
//!
//! This library provides thread-safe shared-state primitives and a bounded
//! worker pool, each with a demonstration scenario runnable from the CLI.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Job, CoreError, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Concurrency primitives:
//!   - [`core::counter`] - Counters behind a mutex, an atomic, or nothing at all
//!   - [`core::kv_store`] - Many-readers/one-writer key/value store
//!   - [`core::lazy`] - Exactly-once initialization shared by many callers
//!   - [`core::ledger`] - Accounts with per-account locks and ordered transfers
//!   - [`core::worker_pool`] - Bounded job/result queues served by W threads
//!   - [`core::r#async`] - The same pool on tokio tasks
//! - [`scenario`] - Runnable demonstrations of every primitive
//! - [`io`] - CSV report output
//!
//! # Ledger Guarantees
//!
//! - Balances never go negative
//! - A transfer moves money atomically: no observer sees it half-applied
//! - Concurrent transfers in opposite directions never deadlock
//! - The sum of all balances only changes through deposits and withdrawals
//!
//! # Worker Pool Guarantees
//!
//! Every accepted job produces exactly one result, whether it succeeds,
//! fails, panics or is cancelled.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod scenario;
pub mod types;

pub use core::{
    AsyncWorkerPool, AtomicCounter, Counter, InitPhase, LazyInitializer, Ledger, MutexCounter,
    PoolConfig, RacyCounter, SharedKeyValueStore, WorkerPool,
};
pub use io::{write_accounts_csv, write_job_results_csv};
pub use types::{Account, AccountId, AccountSnapshot, CoreError, Job, JobId, JobResult};
