//! Read/write-locked key/value store
//!
//! This module provides the `SharedKeyValueStore` struct, a map shared between
//! threads under a single read/write lock.
//!
//! # Locking discipline
//!
//! - `get`, `contains_key`, `read_with`, `len` and `snapshot` take the shared
//!   (read) lock. Any number of them proceed at the same time.
//! - `set`, `delete` and `update` take the exclusive (write) lock. A writer
//!   waits for in-flight readers to release and excludes every other reader
//!   and writer until it is done, so no reader can observe a half-applied
//!   write.

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Thread-safe associative store with many-readers/one-writer locking
#[derive(Debug)]
pub struct SharedKeyValueStore<K, V> {
    data: RwLock<HashMap<K, V>>,
}

impl<K, V> SharedKeyValueStore<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a key
    ///
    /// Returns a clone of the stored value, or `None` when the key is absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.data.read().get(key).cloned()
    }

    /// Run a closure against the stored value while the read lock is held
    ///
    /// Useful when the value is expensive to clone. Other readers are not
    /// blocked while the closure runs; writers are.
    pub fn read_with<Q, R, F>(&self, key: &Q, f: F) -> R
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(Option<&V>) -> R,
    {
        let data = self.data.read();
        f(data.get(key))
    }

    /// Whether the key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.data.read().contains_key(key)
    }

    /// Insert or replace a value, returning the previous one
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    /// Remove a key, returning its value if it was present
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.data.write().remove(key)
    }

    /// Read-modify-write a single key under the write lock
    ///
    /// The closure receives the current value (if any) and returns the value
    /// to store. No other reader or writer runs between the read and the
    /// write. Returns a clone of the stored value.
    pub fn update<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce(Option<&V>) -> V,
        V: Clone,
    {
        let mut data = self.data.write();
        let next = f(data.get(&key));
        data.insert(key, next.clone());
        next
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Clone of the whole map, taken under one read lock
    pub fn snapshot(&self) -> HashMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.data.read().clone()
    }
}

impl<K, V> Default for SharedKeyValueStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
