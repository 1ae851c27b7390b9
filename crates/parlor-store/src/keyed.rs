//! The [`KeyedStore`] primitive.
//!
//! A `HashMap` behind a single `Mutex`. Every operation, reads included,
//! takes the lock, so each call is linearizable with respect to every other
//! call on the same store. Entry counts are expected to be small; there is
//! no separate read path.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe associative container.
///
/// `Set` never rejects duplicates; callers layer their own "already exists"
/// policy on top (see [`Repository`](crate::Repository)). Snapshots returned
/// by [`keys`](Self::keys), [`values`](Self::values) and
/// [`entries`](Self::entries) reflect the map at some instant between call
/// and return.
pub struct KeyedStore<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash,
{
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    // Every mutation leaves the map consistent before any user closure can
    // panic, so a poisoned lock is safe to recover.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite `key`.
    pub fn set(&self, key: K, value: V) {
        self.lock().insert(key, value);
    }

    /// Insert or overwrite `key`, returning the value it replaced.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.lock().insert(key, value)
    }

    /// Insert `value` only if `key` is absent. Returns `false` if the key was
    /// already present, in which case the store is unchanged.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut map = self.lock();
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, value);
        true
    }

    /// Overwrite `key` only if it is already present. Returns `false` if the
    /// key was absent, in which case the store is unchanged.
    pub fn replace_existing(&self, key: K, value: V) -> bool {
        match self.lock().get_mut(&key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Remove `key` if present. No-op otherwise.
    pub fn delete(&self, key: &K) {
        self.lock().remove(key);
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key)
    }

    /// Remove `key` only if `predicate` holds for its current value.
    ///
    /// The check and the removal happen under one lock acquisition.
    pub fn remove_if<F>(&self, key: &K, predicate: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        let mut map = self.lock();
        match map.get(key) {
            Some(value) if predicate(value) => map.remove(key),
            _ => None,
        }
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove every entry for which `keep` returns `false`.
    ///
    /// Returns the number of entries removed.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|k, v| keep(k, v));
        before - map.len()
    }
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Look up `key`. Returns `None` when absent.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Return the value for `key`, creating it with `make` if absent.
    ///
    /// Lookup and creation happen under one lock acquisition, so concurrent
    /// callers racing on the same key all observe the same value.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.lock().entry(key).or_insert_with(make).clone()
    }

    /// Point-in-time snapshot of all keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.lock().keys().cloned().collect()
    }

    /// Point-in-time snapshot of all values, in no particular order.
    pub fn values(&self) -> Vec<V> {
        self.lock().values().cloned().collect()
    }

    /// Point-in-time snapshot of all entries, in no particular order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K, V> Default for KeyedStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for KeyedStore<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
