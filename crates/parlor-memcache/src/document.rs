//! Documents: named bags of serialized entries.

use std::sync::Arc;

use parlor_store::KeyedStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{MemcacheError, Result};
use crate::item::Item;
use crate::names::validate_name;

/// Read access to a document.
pub trait DocumentReader {
    /// The entry under `key`, or the zero [`Item`] if absent.
    fn get(&self, key: &str) -> Item;

    /// Snapshot of every entry, in no particular order.
    fn get_all(&self) -> Vec<Item>;
}

/// Write access to a document.
pub trait DocumentWriter {
    /// Serialize `value` and store it under `key`.
    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()>;

    /// Remove the entry under `key`, if present.
    fn delete(&self, key: &str);
}

struct DocumentInner {
    name: String,
    entries: KeyedStore<String, Vec<u8>>,
}

/// A named container of key → serialized-value entries.
///
/// `Document` is a cheap handle: clones share the same entries. Values are
/// encoded with bincode on [`set`](DocumentWriter::set) and decoded by the
/// caller through [`Item::decode`].
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    /// Create an empty, unattached document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                name: name.into(),
                entries: KeyedStore::new(),
            }),
        }
    }

    /// The name this document was created with.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Like [`set`](DocumentWriter::set), but also rejects keys that could
    /// not be written to disk, so the problem surfaces here rather than at
    /// flush time.
    pub fn set_checked<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        if !key.is_empty() {
            validate_name(key)?;
        }
        self.set(key, value)
    }

    /// Store bytes that are already in serialized form.
    ///
    /// Used when rehydrating from disk, where re-encoding would wrap the
    /// bytes a second time.
    pub fn set_raw(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(MemcacheError::KeyRequired);
        }
        self.inner.entries.set(key.to_string(), bytes);
        Ok(())
    }

    /// Decode the entry under `key` as `T`. Shorthand for `get(key).decode()`.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key).decode()
    }

    /// Snapshot of all entry keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.keys()
    }

    /// Whether an entry is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.contains_key(&key.to_string())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if the document holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl DocumentReader for Document {
    fn get(&self, key: &str) -> Item {
        if key.is_empty() {
            return Item::default();
        }
        match self.inner.entries.get(&key.to_string()) {
            Some(value) => Item::new(key, value),
            None => Item::default(),
        }
    }

    fn get_all(&self) -> Vec<Item> {
        self.inner
            .entries
            .entries()
            .into_iter()
            .map(|(key, value)| Item { key, value })
            .collect()
    }
}

impl DocumentWriter for Document {
    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        if key.is_empty() {
            return Err(MemcacheError::KeyRequired);
        }
        let bytes = bincode::serialize(value).map_err(|source| MemcacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        if let Err(e) = validate_name(key) {
            warn!(
                document = %self.inner.name,
                key,
                error = %e,
                "entry key cannot be flushed to disk"
            );
        }
        debug!(document = %self.inner.name, key, bytes = bytes.len(), "set entry");
        self.inner.entries.set(key.to_string(), bytes);
        Ok(())
    }

    fn delete(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        self.inner.entries.delete(&key.to_string());
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.inner.name)
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::thread;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Metadata {
        name: String,
        admins: Vec<String>,
        members: BTreeMap<String, bool>,
    }

    fn metadata() -> Metadata {
        let mut members = BTreeMap::new();
        members.insert("alice".to_string(), true);
        members.insert("bob".to_string(), false);
        Metadata {
            name: "lobby".into(),
            admins: vec!["alice".into()],
            members,
        }
    }

    // -----------------------------------------------------------------------
    // Set / Get
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_decode_struct() {
        let doc = Document::new("room-1");
        doc.set("metadata", &metadata()).unwrap();
        let decoded: Metadata = doc.get("metadata").decode().unwrap();
        assert_eq!(decoded, metadata());
    }

    #[test]
    fn set_rejects_empty_key() {
        let doc = Document::new("room-1");
        assert!(matches!(doc.set("", &1u8), Err(MemcacheError::KeyRequired)));
        assert!(matches!(doc.set_raw("", vec![1]), Err(MemcacheError::KeyRequired)));
        assert!(doc.is_empty());
    }

    #[test]
    fn set_checked_rejects_unpersistable_keys() {
        let doc = Document::new("room-1");
        for key in ["a/b", ".hidden", "..", "nul\0"] {
            assert!(
                matches!(doc.set_checked(key, &1u8), Err(MemcacheError::InvalidName { .. })),
                "{key:?}"
            );
        }
        assert!(matches!(doc.set_checked("", &1u8), Err(MemcacheError::KeyRequired)));
        assert!(doc.is_empty());

        doc.set_checked("msg-1", &1u8).unwrap();
        assert!(doc.contains_key("msg-1"));

        // The lenient path still stores the key.
        doc.set("a/b", &2u8).unwrap();
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn get_missing_returns_zero_item() {
        let doc = Document::new("room-1");
        assert_eq!(doc.get("nope"), Item::default());
        assert_eq!(doc.get(""), Item::default());
    }

    #[test]
    fn never_written_key_decodes_as_empty_item() {
        let doc = Document::new("room-1");
        let err = doc.get_as::<Metadata>("never").unwrap_err();
        assert!(err.is_empty_item());
    }

    #[test]
    fn wrong_type_is_decode_error() {
        let doc = Document::new("room-1");
        doc.set("count", &7u8).unwrap();
        let err = doc.get_as::<Metadata>("count").unwrap_err();
        assert!(matches!(err, MemcacheError::Decode { .. }));
    }

    #[test]
    fn set_raw_stores_bytes_verbatim() {
        let doc = Document::new("room-1");
        let bytes = bincode::serialize(&metadata()).unwrap();
        doc.set_raw("metadata", bytes.clone()).unwrap();
        assert_eq!(doc.get("metadata").value, bytes);
        assert_eq!(doc.get_as::<Metadata>("metadata").unwrap(), metadata());
    }

    #[test]
    fn get_all_and_delete() {
        let doc = Document::new("room-1");
        doc.set("a", "x").unwrap();
        doc.set("b", "y").unwrap();
        let mut keys: Vec<String> = doc.get_all().into_iter().map(|i| i.key).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        doc.delete("a");
        doc.delete("missing");
        doc.delete("");
        assert_eq!(doc.keys(), vec!["b".to_string()]);
        assert!(!doc.contains_key("a"));
    }

    #[test]
    fn clones_share_entries() {
        let doc = Document::new("room-1");
        let other = doc.clone();
        doc.set("k", &42u32).unwrap();
        assert_eq!(other.get_as::<u32>("k").unwrap(), 42);
        assert!(doc.ptr_eq(&other));
        assert!(!doc.ptr_eq(&Document::new("room-1")));
    }

    #[test]
    fn concurrent_writers() {
        let doc = Document::new("messages");
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let doc = doc.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        doc.set(&format!("{t}-{i}"), &(t, i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(doc.len(), 4_000);
        assert_eq!(doc.get_as::<(i32, i32)>("3-17").unwrap(), (3, 17));
    }

    #[test]
    fn debug_format() {
        let doc = Document::new("room-1");
        let debug = format!("{doc:?}");
        assert!(debug.contains("room-1"));
        assert!(debug.contains("entry_count"));
    }

    proptest! {
        #[test]
        fn set_then_get_decodes_original(
            key in "[a-z]{1,12}",
            name in ".*",
            admins in proptest::collection::vec(".*", 0..4),
        ) {
            let doc = Document::new("prop");
            let value = Metadata { name, admins, members: BTreeMap::new() };
            doc.set(&key, &value).unwrap();
            prop_assert_eq!(doc.get_as::<Metadata>(&key).unwrap(), value);
        }
    }
}
