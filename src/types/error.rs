//! Error types for the shared-state core
//!
//! This module defines every error an operation of the core can return.
//! None of them is fatal: each is handed back to the immediate caller, and
//! the operation that produced it left shared state untouched.
//!
//! # Error Categories
//!
//! - **Ledger Errors**: Invalid amounts, insufficient funds, unknown or identical accounts
//! - **Arithmetic Errors**: Overflow in balance calculations
//! - **Pool Errors**: Submission after shutdown, failed or cancelled jobs, timeouts

use super::account::AccountId;
use super::job::JobId;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the shared-state core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A deposit, withdrawal, transfer or opening amount was rejected
    ///
    /// Movements must be strictly positive; opening balances must not be negative.
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Operation that rejected it
        operation: String,
    },

    /// A withdrawal or transfer exceeds the source balance
    ///
    /// Checked while the source account lock is held. The account is unchanged.
    #[error(
        "Insufficient funds in account {account}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// Source account id
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// A transfer names the same account as source and destination
    #[error("Transfer source and destination are the same account {account}")]
    SameAccount {
        /// The account id given twice
        account: AccountId,
    },

    /// An operation references an account the ledger does not hold
    #[error("Unknown account {account}")]
    UnknownAccount {
        /// The missing account id
        account: AccountId,
    },

    /// Applying the amount would overflow the balance representation
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: AccountId,
    },

    /// A job was submitted after shutdown began
    #[error("Worker pool is closed")]
    PoolClosed,

    /// The processing function reported failure (or panicked) for one job
    ///
    /// Isolated to that job's result; the worker keeps running.
    #[error("Job {job} failed: {message}")]
    JobFailed {
        /// Job id
        job: JobId,
        /// Failure detail
        message: String,
    },

    /// The job was abandoned because the pool was cancelled
    #[error("Job {job} was cancelled")]
    JobCancelled {
        /// Job id
        job: JobId,
    },

    /// A bounded wait for a result elapsed
    ///
    /// Work already claimed by a worker keeps running unless the pool is cancelled.
    #[error("Timed out after {waited:?} waiting for a job result")]
    Timeout {
        /// How long the caller waited
        waited: Duration,
    },

    /// Every worker has exited and no result is left to receive
    #[error("Result queue is closed and drained")]
    ResultsExhausted,
}

// Helper functions for creating common errors

impl CoreError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        CoreError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        CoreError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create a SameAccount error
    pub fn same_account(account: AccountId) -> Self {
        CoreError::SameAccount { account }
    }

    /// Create an UnknownAccount error
    pub fn unknown_account(account: AccountId) -> Self {
        CoreError::UnknownAccount { account }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        CoreError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a JobFailed error
    pub fn job_failed(job: JobId, message: impl Into<String>) -> Self {
        CoreError::JobFailed {
            job,
            message: message.into(),
        }
    }

    /// Create a JobCancelled error
    pub fn job_cancelled(job: JobId) -> Self {
        CoreError::JobCancelled { job }
    }

    /// Create a Timeout error
    pub fn timeout(waited: Duration) -> Self {
        CoreError::Timeout { waited }
    }
}
