//! Exactly-once lazy initialization
//!
//! `LazyInitializer` is an explicit value callers construct and share, in
//! place of a process-wide "once" flag plus a global cached result.
//!
//! # State machine
//!
//! ```text
//! NotStarted ──(first caller)──► InProgress ──(init returns Ok)──► Done(value)
//!      ▲                             │
//!      └──(init returns Err/panics)──┘
//! ```
//!
//! The caller that moves the state to `InProgress` runs the init function
//! with no lock held. Every other caller blocks on a condition variable until
//! the state leaves `InProgress`. Once `Done`, the value is handed out as a
//! shared `Arc`, so all callers observe the very same result.
//!
//! Failure is not cached. If the init function returns an error (or panics)
//! the state reverts to `NotStarted`: the failing caller gets its error back
//! and the next caller, including any that were waiting, runs the function
//! again.

use parking_lot::{Condvar, Mutex};
use std::convert::Infallible;
use std::sync::Arc;

/// Observable phase of a [`LazyInitializer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    NotStarted,
    InProgress,
    Done,
}

#[derive(Debug)]
enum InitState<T> {
    NotStarted,
    InProgress,
    Done(Arc<T>),
}

/// Exactly-once initialization guard
#[derive(Debug)]
pub struct LazyInitializer<T> {
    state: Mutex<InitState<T>>,
    ready: Condvar,
}

impl<T> LazyInitializer<T> {
    /// Create an initializer in the `NotStarted` phase
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InitState::NotStarted),
            ready: Condvar::new(),
        }
    }

    /// Return the cached value, running `init` first if nobody has yet
    pub fn get_or_init<F>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        match self.try_get_or_init(|| Ok::<T, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Return the cached value, running the fallible `init` first if needed
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init` when this call was the one that
    /// ran it. The initializer is left in `NotStarted` so a later call retries.
    pub fn try_get_or_init<E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut state = self.state.lock();
        loop {
            match &*state {
                InitState::Done(value) => return Ok(Arc::clone(value)),
                InitState::InProgress => self.ready.wait(&mut state),
                InitState::NotStarted => break,
            }
        }
        *state = InitState::InProgress;
        drop(state);

        let mut reset = ResetOnExit {
            owner: self,
            armed: true,
        };

        match init() {
            Ok(value) => {
                let value = Arc::new(value);
                reset.armed = false;
                *self.state.lock() = InitState::Done(Arc::clone(&value));
                self.ready.notify_all();
                Ok(value)
            }
            // `reset` drops here and reverts to NotStarted.
            Err(e) => Err(e),
        }
    }

    /// The cached value, if initialization has completed
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            InitState::Done(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Whether initialization has completed
    pub fn is_initialized(&self) -> bool {
        self.phase() == InitPhase::Done
    }

    /// Current phase
    pub fn phase(&self) -> InitPhase {
        match &*self.state.lock() {
            InitState::NotStarted => InitPhase::NotStarted,
            InitState::InProgress => InitPhase::InProgress,
            InitState::Done(_) => InitPhase::Done,
        }
    }
}

impl<T> Default for LazyInitializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverts an in-progress initialization unless disarmed
///
/// Covers both the error return and a panic unwinding out of the init
/// function, so waiters are never left parked on an `InProgress` state.
struct ResetOnExit<'a, T> {
    owner: &'a LazyInitializer<T>,
    armed: bool,
}

impl<T> Drop for ResetOnExit<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            *self.owner.state.lock() = InitState::NotStarted;
            self.owner.ready.notify_all();
            tracing::debug!("lazy initialization failed, state reset for retry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fresh_initializer_is_not_started() {
        let lazy: LazyInitializer<u32> = LazyInitializer::new();

        assert_eq!(lazy.phase(), InitPhase::NotStarted);
        assert!(lazy.get().is_none());
        assert!(!lazy.is_initialized());
    }

    #[test]
    fn test_second_call_returns_cached_value() {
        let lazy = LazyInitializer::new();

        let first = lazy.get_or_init(|| 42);
        let second = lazy.get_or_init(|| 7);

        assert_eq!(*first, 42);
        assert_eq!(*second, 42);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(lazy.phase(), InitPhase::Done);
    }

    #[test]
    fn test_fifty_concurrent_callers_run_init_once() {
        let lazy = Arc::new(LazyInitializer::new());
        let invocations = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..50 {
            let lazy_clone = Arc::clone(&lazy);
            let invocations_clone = Arc::clone(&invocations);
            handles.push(thread::spawn(move || {
                lazy_clone.get_or_init(|| {
                    invocations_clone.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    let mut config = HashMap::new();
                    config.insert("host", "localhost");
                    config.insert("port", "8080");
                    config
                })
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        for result in &results {
            assert!(Arc::ptr_eq(result, &results[0]));
            assert_eq!(result.get("port"), Some(&"8080"));
        }
    }

    #[test]
    fn test_failure_is_not_cached() {
        let lazy: LazyInitializer<u32> = LazyInitializer::new();

        let failed: Result<Arc<u32>, String> = lazy.try_get_or_init(|| Err("offline".to_string()));
        assert_eq!(failed.unwrap_err(), "offline");
        assert_eq!(lazy.phase(), InitPhase::NotStarted);

        let retried: Result<Arc<u32>, String> = lazy.try_get_or_init(|| Ok(5));
        assert_eq!(*retried.unwrap(), 5);
        assert!(lazy.is_initialized());
    }

    #[test]
    fn test_panic_in_init_resets_state() {
        let lazy = Arc::new(LazyInitializer::<u32>::new());

        let lazy_clone = Arc::clone(&lazy);
        let outcome = thread::spawn(move || {
            lazy_clone.get_or_init(|| panic!("init exploded"));
        })
        .join();

        assert!(outcome.is_err());
        assert_eq!(lazy.phase(), InitPhase::NotStarted);
        assert_eq!(*lazy.get_or_init(|| 9), 9);
    }

    #[test]
    fn test_waiters_retry_after_failure() {
        let lazy = Arc::new(LazyInitializer::new());
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let lazy_clone = Arc::clone(&lazy);
            let attempts_clone = Arc::clone(&attempts);
            handles.push(thread::spawn(move || {
                lazy_clone.try_get_or_init(|| {
                    let attempt = attempts_clone.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    if attempt == 0 {
                        Err("first attempt fails")
                    } else {
                        Ok(attempt)
                    }
                })
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let failures = results.iter().filter(|r| r.is_err()).count();
        let successes: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

        assert_eq!(failures, 1);
        assert_eq!(successes.len(), 9);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        for value in &successes {
            assert!(Arc::ptr_eq(value, successes[0]));
        }
    }
}
