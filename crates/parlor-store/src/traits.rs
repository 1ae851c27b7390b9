//! The narrow read/write contract consumed by the request-handling layer.

use crate::error::Result;

/// Read access to a keyed entity table.
pub trait Reader<K, V>: Send + Sync {
    /// Read the value under `key`.
    ///
    /// Returns [`RepoError::NotFound`](crate::RepoError::NotFound) if absent.
    fn read(&self, key: &K) -> Result<V>;

    /// Snapshot of every stored value, in no particular order.
    fn read_all(&self) -> Result<Vec<V>>;
}

/// Write access to a keyed entity table.
pub trait Writer<K, V>: Send + Sync {
    /// Create `key`. Fails with [`RepoError::Conflict`](crate::RepoError::Conflict)
    /// if it already exists.
    fn write(&self, key: K, value: V) -> Result<()>;

    /// Replace the value of an existing `key`.
    fn update(&self, key: K, value: V) -> Result<()>;

    /// Remove `key`, returning the value it held.
    fn delete(&self, key: &K) -> Result<V>;
}

/// Combined read and write access.
pub trait ReadWriter<K, V>: Reader<K, V> + Writer<K, V> {}

impl<K, V, T> ReadWriter<K, V> for T where T: Reader<K, V> + Writer<K, V> {}
