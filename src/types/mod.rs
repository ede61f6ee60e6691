//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account identities, locked account state and snapshots
//! - `job`: Worker pool jobs and their results
//! - `error`: Error types for the shared-state core

pub mod account;
pub mod error;
pub mod job;

pub use account::{Account, AccountId, AccountSnapshot};
pub use error::CoreError;
pub use job::{Job, JobId, JobResult};
