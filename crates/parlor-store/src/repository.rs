//! Conflict-checked entity tables.
//!
//! [`Repository`] layers "create must not overwrite" and "update must find"
//! policies over a [`KeyedStore`]. Users, rooms and messages are each held
//! in one of these.

use std::hash::Hash;

use tracing::debug;

use crate::error::{RepoError, Result};
use crate::keyed::KeyedStore;
use crate::traits::{Reader, Writer};

/// A named entity table backed by a [`KeyedStore`].
pub struct Repository<K, V> {
    name: &'static str,
    data: KeyedStore<K, V>,
}

impl<K, V> Repository<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty table. `name` only appears in diagnostics.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            data: KeyedStore::new(),
        }
    }

    /// The table's diagnostic name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The underlying store, for callers that need unchecked access.
    pub fn store(&self) -> &KeyedStore<K, V> {
        &self.data
    }
}

impl<K, V> Reader<K, V> for Repository<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn read(&self, key: &K) -> Result<V> {
        self.data.get(key).ok_or(RepoError::NotFound)
    }

    fn read_all(&self) -> Result<Vec<V>> {
        Ok(self.data.values())
    }
}

impl<K, V> Writer<K, V> for Repository<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn write(&self, key: K, value: V) -> Result<()> {
        if !self.data.insert_if_absent(key, value) {
            debug!(table = self.name, "rejected write to existing key");
            return Err(RepoError::Conflict);
        }
        Ok(())
    }

    fn update(&self, key: K, value: V) -> Result<()> {
        if !self.data.replace_existing(key, value) {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<V> {
        self.data.remove(key).ok_or(RepoError::NotFound)
    }
}

impl<K, V> std::fmt::Debug for Repository<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("entity_count", &self.len())
            .finish()
    }
}
