//! Account-related types for the ledger
//!
//! This module defines the Account structure held by the ledger and the
//! plain snapshot type handed out to callers.

use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;

/// Account identifier
///
/// Assigned by the ledger from a monotonically increasing counter, starting
/// at 1. The numeric order of ids is the lock order used by transfers.
pub type AccountId = u64;

/// Ledger account
///
/// Pairs a stable identity with a balance that can only be reached through
/// the account's own lock. The lock is crate-private: callers go through
/// [`crate::core::Ledger`], which is the only place allowed to hold two
/// account locks at once.
#[derive(Debug)]
pub struct Account {
    /// The account identity, fixed at creation
    id: AccountId,

    /// Current balance, guarded by the account lock
    balance: Mutex<Decimal>,
}

impl Account {
    /// Create a new account with the given opening balance
    pub(crate) fn new(id: AccountId, initial_balance: Decimal) -> Self {
        Account {
            id,
            balance: Mutex::new(initial_balance),
        }
    }

    /// The account identity
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Acquire the account lock
    ///
    /// Blocks until the lock is available. The balance may only be read or
    /// mutated through the returned guard.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Decimal> {
        self.balance.lock()
    }

    /// Take a definite snapshot of the account under its lock
    pub fn snapshot(&self) -> AccountSnapshot {
        let balance = *self.lock();
        AccountSnapshot {
            id: self.id,
            balance,
        }
    }
}

/// Point-in-time view of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// The account id
    pub id: AccountId,

    /// Balance observed while the account lock was held
    pub balance: Decimal,
}
