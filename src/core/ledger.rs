//! Account ledger with per-account locks
//!
//! This module provides the `Ledger` struct, the owner of every account and
//! the only component permitted to mutate balances.
//!
//! # Design
//!
//! Accounts live in a `DashMap` index from id to `Arc<Account>`. The index
//! lock is only held long enough to clone the `Arc` out; balances are read
//! and written under each account's own mutex, never under the index lock.
//!
//! # Deadlock avoidance
//!
//! `transfer` is the only operation that holds two account locks. It always
//! acquires the lock of the account with the lower id first. Because every
//! transfer follows that one total order, two transfers can never each hold
//! the lock the other is waiting for, even when they move money in opposite
//! directions between the same pair of accounts.
//!
//! # Atomicity
//!
//! Validation that depends on a balance (sufficient funds, overflow) happens
//! inside the same critical section as the mutation. Each operation either
//! fully applies or leaves every balance untouched.

use crate::types::{Account, AccountId, AccountSnapshot, CoreError};
use dashmap::DashMap;
use parking_lot::MutexGuard;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe account ledger
///
/// All methods take `&self`; share the ledger across threads with an `Arc`.
#[derive(Debug)]
pub struct Ledger {
    /// Account index by id
    accounts: DashMap<AccountId, Arc<Account>>,

    /// Next id to hand out
    next_id: AtomicU64,
}

impl Ledger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a new account
    ///
    /// # Arguments
    ///
    /// * `initial_balance` - Opening balance, must not be negative
    ///
    /// # Returns
    ///
    /// The id of the new account. Every call gets a fresh id greater than
    /// any id handed out before it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `initial_balance` is negative.
    pub fn create_account(&self, initial_balance: Decimal) -> Result<AccountId, CoreError> {
        if initial_balance < Decimal::ZERO {
            return Err(CoreError::invalid_amount(initial_balance, "create_account"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.accounts
            .insert(id, Arc::new(Account::new(id, initial_balance)));

        Ok(id)
    }

    /// Deposit funds into an account
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `UnknownAccount` if the id is not in the ledger
    /// - `ArithmeticOverflow` if the new balance is not representable
    pub fn deposit(&self, id: AccountId, amount: Decimal) -> Result<(), CoreError> {
        ensure_positive(amount, "deposit")?;
        let account = self.account(id)?;

        let mut balance = account.lock();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::arithmetic_overflow("deposit", id))?;

        Ok(())
    }

    /// Withdraw funds from an account
    ///
    /// The sufficiency check and the debit happen under one hold of the
    /// account lock.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `UnknownAccount` if the id is not in the ledger
    /// - `InsufficientFunds` if `amount` exceeds the balance
    pub fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<(), CoreError> {
        ensure_positive(amount, "withdraw")?;
        let account = self.account(id)?;

        let mut balance = account.lock();
        *balance = debit(id, *balance, amount, "withdraw")?;

        Ok(())
    }

    /// Move funds between two accounts
    ///
    /// Locks both accounts in ascending id order, re-checks the source
    /// balance with both locks held, then moves the amount. Both locks are
    /// released on every exit path when the guards drop.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `SameAccount` if `from == to`
    /// - `UnknownAccount` if either id is not in the ledger
    /// - `InsufficientFunds` if `amount` exceeds the source balance
    /// - `ArithmeticOverflow` if the destination balance would overflow
    pub fn transfer(&self, from: AccountId, to: AccountId, amount: Decimal) -> Result<(), CoreError> {
        ensure_positive(amount, "transfer")?;
        if from == to {
            return Err(CoreError::same_account(from));
        }

        let source = self.account(from)?;
        let destination = self.account(to)?;
        let (mut source_balance, mut destination_balance) = lock_in_order(&source, &destination);

        let new_source = debit(from, *source_balance, amount, "transfer").inspect_err(|_| {
            tracing::debug!(from, to, %amount, "transfer rejected: insufficient funds");
        })?;
        let new_destination = destination_balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::arithmetic_overflow("transfer", to))?;

        *source_balance = new_source;
        *destination_balance = new_destination;

        Ok(())
    }

    /// Current balance of an account, read under its lock
    ///
    /// # Errors
    ///
    /// Returns `UnknownAccount` if the id is not in the ledger.
    pub fn balance(&self, id: AccountId) -> Result<Decimal, CoreError> {
        let account = self.account(id)?;
        let balance = *account.lock();
        Ok(balance)
    }

    /// Snapshots of every account, sorted by id
    ///
    /// Each account is locked individually, so the list is not a
    /// ledger-wide atomic snapshot while transfers are in flight.
    pub fn accounts(&self) -> Vec<AccountSnapshot> {
        let accounts: Vec<Arc<Account>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots: Vec<AccountSnapshot> =
            accounts.iter().map(|account| account.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    /// Sum of every balance
    ///
    /// Same consistency caveat as [`Ledger::accounts`]: exact once no
    /// operation is in flight.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the sum is not representable.
    pub fn total_balance(&self) -> Result<Decimal, CoreError> {
        self.accounts()
            .into_iter()
            .try_fold(Decimal::ZERO, |sum, snapshot| {
                sum.checked_add(snapshot.balance)
                    .ok_or_else(|| CoreError::arithmetic_overflow("total_balance", snapshot.id))
            })
    }

    /// Number of accounts in the ledger
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn account(&self, id: AccountId) -> Result<Arc<Account>, CoreError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CoreError::unknown_account(id))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_positive(amount: Decimal, operation: &str) -> Result<(), CoreError> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::invalid_amount(amount, operation));
    }
    Ok(())
}

fn debit(
    id: AccountId,
    balance: Decimal,
    amount: Decimal,
    operation: &str,
) -> Result<Decimal, CoreError> {
    if amount > balance {
        return Err(CoreError::insufficient_funds(id, balance, amount));
    }
    balance
        .checked_sub(amount)
        .ok_or_else(|| CoreError::arithmetic_overflow(operation, id))
}

/// Lock two distinct accounts lower id first
///
/// Returns the guards in argument order, whatever order they were taken in.
fn lock_in_order<'a>(
    source: &'a Account,
    destination: &'a Account,
) -> (MutexGuard<'a, Decimal>, MutexGuard<'a, Decimal>) {
    debug_assert_ne!(source.id(), destination.id());

    if source.id() < destination.id() {
        let source_guard = source.lock();
        let destination_guard = destination.lock();
        (source_guard, destination_guard)
    } else {
        let destination_guard = destination.lock();
        let source_guard = source.lock();
        (source_guard, destination_guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rstest::rstest;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn test_create_account_assigns_increasing_ids() {
        let ledger = Ledger::new();

        let a = ledger.create_account(dec(10)).unwrap();
        let b = ledger.create_account(Decimal::ZERO).unwrap();
        let c = ledger.create_account(dec(5)).unwrap();

        assert!(a < b && b < c);
        assert_eq!(ledger.account_count(), 3);
        assert_eq!(ledger.balance(a).unwrap(), dec(10));
        assert_eq!(ledger.balance(b).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_create_account_rejects_negative_balance() {
        let ledger = Ledger::new();

        let result = ledger.create_account(dec(-1));

        assert_eq!(
            result.unwrap_err(),
            CoreError::invalid_amount(dec(-1), "create_account")
        );
        assert_eq!(ledger.account_count(), 0);
    }

    #[test]
    fn test_deposit_adds_to_balance() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(100)).unwrap();

        ledger.deposit(a, Decimal::new(255, 1)).unwrap();

        assert_eq!(ledger.balance(a).unwrap(), Decimal::new(1255, 1));
    }

    #[rstest]
    #[case::zero(Decimal::ZERO)]
    #[case::negative(dec(-10))]
    fn test_non_positive_amounts_are_rejected(#[case] amount: Decimal) {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(100)).unwrap();
        let b = ledger.create_account(dec(100)).unwrap();

        assert_eq!(
            ledger.deposit(a, amount).unwrap_err(),
            CoreError::invalid_amount(amount, "deposit")
        );
        assert_eq!(
            ledger.withdraw(a, amount).unwrap_err(),
            CoreError::invalid_amount(amount, "withdraw")
        );
        assert_eq!(
            ledger.transfer(a, b, amount).unwrap_err(),
            CoreError::invalid_amount(amount, "transfer")
        );
        assert_eq!(ledger.balance(a).unwrap(), dec(100));
        assert_eq!(ledger.balance(b).unwrap(), dec(100));
    }

    #[test]
    fn test_withdraw_exceeding_balance_leaves_account_unchanged() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(1000)).unwrap();

        let result = ledger.withdraw(a, dec(1001));

        assert_eq!(
            result.unwrap_err(),
            CoreError::insufficient_funds(a, dec(1000), dec(1001))
        );
        assert_eq!(ledger.balance(a).unwrap(), dec(1000));
    }

    #[test]
    fn test_withdraw_entire_balance() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(50)).unwrap();

        ledger.withdraw(a, dec(50)).unwrap();

        assert_eq!(ledger.balance(a).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_transfer_to_same_account_is_rejected() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(1000)).unwrap();

        let result = ledger.transfer(a, a, dec(10));

        assert_eq!(result.unwrap_err(), CoreError::same_account(a));
        assert_eq!(ledger.balance(a).unwrap(), dec(1000));
    }

    #[test]
    fn test_unknown_accounts_are_reported() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(10)).unwrap();

        assert_eq!(ledger.balance(99).unwrap_err(), CoreError::unknown_account(99));
        assert_eq!(
            ledger.deposit(99, dec(1)).unwrap_err(),
            CoreError::unknown_account(99)
        );
        assert_eq!(
            ledger.transfer(a, 99, dec(1)).unwrap_err(),
            CoreError::unknown_account(99)
        );
        assert_eq!(ledger.balance(a).unwrap(), dec(10));
    }

    #[test]
    fn test_transfer_moves_funds_in_both_directions() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(1000)).unwrap();
        let b = ledger.create_account(dec(500)).unwrap();

        ledger.transfer(a, b, dec(100)).unwrap();
        ledger.transfer(b, a, dec(50)).unwrap();

        assert_eq!(ledger.balance(a).unwrap(), dec(950));
        assert_eq!(ledger.balance(b).unwrap(), dec(550));
    }

    #[test]
    fn test_transfer_with_insufficient_funds_mutates_nothing() {
        let ledger = Ledger::new();
        let a = ledger.create_account(dec(10)).unwrap();
        let b = ledger.create_account(dec(10)).unwrap();

        let result = ledger.transfer(b, a, dec(11));

        assert_eq!(
            result.unwrap_err(),
            CoreError::insufficient_funds(b, dec(10), dec(11))
        );
        assert_eq!(ledger.balance(a).unwrap(), dec(10));
        assert_eq!(ledger.balance(b).unwrap(), dec(10));
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let ledger = Ledger::new();
        let a = ledger.create_account(Decimal::MAX).unwrap();

        let result = ledger.deposit(a, dec(1));

        assert_eq!(
            result.unwrap_err(),
            CoreError::arithmetic_overflow("deposit", a)
        );
        assert_eq!(ledger.balance(a).unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_accounts_are_sorted_by_id() {
        let ledger = Ledger::new();
        for balance in [5, 3, 8, 1] {
            ledger.create_account(dec(balance)).unwrap();
        }

        let ids: Vec<AccountId> = ledger.accounts().iter().map(|s| s.id).collect();

        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(ledger.total_balance().unwrap(), dec(17));
    }

    // Concurrent access tests

    #[test]
    fn test_opposing_concurrent_transfers_conserve_total() {
        let ledger = Arc::new(Ledger::new());
        let a = ledger.create_account(dec(1000)).unwrap();
        let b = ledger.create_account(dec(500)).unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let mut handles = vec![];

        // Observer: no balance is ever seen negative
        let observer = {
            let ledger = Arc::clone(&ledger);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    assert!(ledger.balance(a).unwrap() >= Decimal::ZERO);
                    assert!(ledger.balance(b).unwrap() >= Decimal::ZERO);
                }
            })
        };

        for i in 0..10 {
            let ledger_clone = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                if i % 2 == 0 {
                    ledger_clone.transfer(a, b, dec(100))
                } else {
                    ledger_clone.transfer(b, a, dec(50))
                }
            }));
        }

        for handle in handles {
            // Every transfer succeeds: no direction can run dry with these amounts
            handle.join().unwrap().unwrap();
        }
        done.store(true, Ordering::SeqCst);
        observer.join().unwrap();

        assert_eq!(ledger.balance(a).unwrap(), dec(750));
        assert_eq!(ledger.balance(b).unwrap(), dec(750));
        assert_eq!(ledger.total_balance().unwrap(), dec(1500));
    }

    #[test]
    fn test_opposing_transfers_never_deadlock() {
        let ledger = Arc::new(Ledger::new());
        let a = ledger.create_account(dec(1000)).unwrap();
        let b = ledger.create_account(dec(1000)).unwrap();
        let (done_tx, done_rx) = mpsc::channel();

        for direction in 0..4 {
            let ledger_clone = Arc::clone(&ledger);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..200 {
                    let amount = dec(rng.gen_range(1..=20));
                    if rng.gen_bool(0.2) {
                        thread::sleep(Duration::from_micros(rng.gen_range(0..200)));
                    }
                    let _ = if direction % 2 == 0 {
                        ledger_clone.transfer(a, b, amount)
                    } else {
                        ledger_clone.transfer(b, a, amount)
                    };
                }
                done_tx.send(()).unwrap();
            });
        }
        drop(done_tx);

        for _ in 0..4 {
            done_rx
                .recv_timeout(Duration::from_secs(30))
                .expect("transfers did not finish: possible deadlock");
        }
        assert_eq!(ledger.total_balance().unwrap(), dec(2000));
    }

    #[test]
    fn test_concurrent_withdrawals_never_overdraw() {
        let ledger = Arc::new(Ledger::new());
        let a = ledger.create_account(dec(100)).unwrap();
        let mut handles = vec![];

        for _ in 0..50 {
            let ledger_clone = Arc::clone(&ledger);
            handles.push(thread::spawn(move || ledger_clone.withdraw(a, dec(3))));
        }

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();

        // 33 withdrawals of 3 fit in 100
        assert_eq!(successes, 33);
        assert_eq!(ledger.balance(a).unwrap(), dec(1));
    }

    #[test]
    fn test_ring_of_transfers_conserves_total() {
        let ledger = Arc::new(Ledger::new());
        let ids: Vec<AccountId> = (0..5)
            .map(|_| ledger.create_account(dec(200)).unwrap())
            .collect();
        let mut handles = vec![];

        for (i, &from) in ids.iter().enumerate() {
            let to = ids[(i + 1) % ids.len()];
            let ledger_clone = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _ = ledger_clone.transfer(from, to, dec(7));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.total_balance().unwrap(), dec(1000));
        for snapshot in ledger.accounts() {
            assert!(snapshot.balance >= Decimal::ZERO);
        }
    }
}
