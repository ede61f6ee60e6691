//! Asynchronous implementations of core components
//!
//! This module provides tokio-based counterparts of the thread-based
//! components in [`crate::core`].
//!
//! # Architecture
//!
//! - **AsyncWorkerPool**: the same bounded job/result contract as
//!   [`crate::core::WorkerPool`], with workers running as tokio tasks and
//!   in-flight jobs racing against the pool's cancellation token
//!
//! # Runtime
//!
//! Constructors spawn tasks and must be called from within a tokio runtime.
//! A multi-threaded runtime gives true parallelism between workers.

pub mod worker_pool;

pub use worker_pool::AsyncWorkerPool;
