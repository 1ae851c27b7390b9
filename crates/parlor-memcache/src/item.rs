use serde::de::DeserializeOwned;

use crate::error::{MemcacheError, Result};

/// A single document entry: its key and the serialized bytes stored under it.
///
/// The zero item (`Item::default()`) stands for "nothing stored here".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub value: Vec<u8>,
}

impl Item {
    /// Create an item from already-serialized bytes.
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Returns `true` if the item carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Decode the stored bytes as `T`.
    ///
    /// Fails with [`MemcacheError::EmptyItem`] when there are no bytes and
    /// with [`MemcacheError::Decode`] when the bytes are not a valid `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        if self.value.is_empty() {
            return Err(MemcacheError::EmptyItem {
                key: self.key.clone(),
            });
        }
        bincode::deserialize(&self.value).map_err(|source| MemcacheError::Decode {
            key: self.key.clone(),
            source,
        })
    }

    /// Decode into an existing destination. `dest` is left untouched on error.
    pub fn decode_into<T: DeserializeOwned>(&self, dest: &mut T) -> Result<()> {
        *dest = self.decode()?;
        Ok(())
    }
}
