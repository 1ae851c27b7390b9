//! Collections: named groups of documents.

use std::sync::Arc;

use parlor_store::KeyedStore;

use crate::document::Document;
use crate::error::{MemcacheError, Result};

struct CollectionInner {
    name: String,
    documents: KeyedStore<String, Document>,
}

/// A named group of [`Document`]s keyed by document name.
///
/// Like [`Document`], a `Collection` is a shared handle; clones see the
/// same documents.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                name: name.into(),
                documents: KeyedStore::new(),
            }),
        }
    }

    /// The name this collection was created with.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Return the document called `name`, creating it if absent.
    ///
    /// Concurrent calls with the same name always return handles to one
    /// document.
    pub fn document(&self, name: &str) -> Document {
        self.inner
            .documents
            .get_or_insert_with(name.to_string(), || Document::new(name))
    }

    /// Return the document called `name` without creating it.
    pub fn get(&self, name: &str) -> Option<Document> {
        self.inner.documents.get(&name.to_string())
    }

    /// Register `document` under `key`, replacing any document already there.
    pub fn set(&self, key: &str, document: Document) -> Result<()> {
        if key.is_empty() {
            return Err(MemcacheError::KeyRequired);
        }
        self.inner.documents.set(key.to_string(), document);
        Ok(())
    }

    /// Drop the document under `name`, returning it if it existed.
    pub fn remove(&self, name: &str) -> Option<Document> {
        self.inner.documents.remove(&name.to_string())
    }

    /// Snapshot of every document, in no particular order.
    pub fn documents(&self) -> Vec<Document> {
        self.inner.documents.values()
    }

    /// Snapshot of `(key, document)` pairs.
    pub(crate) fn entries(&self) -> Vec<(String, Document)> {
        self.inner.documents.entries()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.inner.documents.len()
    }

    /// Returns `true` if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.inner.documents.is_empty()
    }

    /// Whether two handles refer to the same collection.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("document_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentReader, DocumentWriter};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn document_is_get_or_create() {
        let rooms = Collection::new("rooms");
        let a = rooms.document("lobby");
        let b = rooms.document("lobby");
        assert!(a.ptr_eq(&b));
        assert_eq!(rooms.len(), 1);
        assert_eq!(a.name(), "lobby");
    }

    #[test]
    fn get_does_not_create() {
        let rooms = Collection::new("rooms");
        assert!(rooms.get("lobby").is_none());
        assert!(rooms.is_empty());
    }

    #[test]
    fn set_and_remove() {
        let rooms = Collection::new("rooms");
        let doc = Document::new("lobby");
        doc.set("topic", "general").unwrap();

        assert!(matches!(
            rooms.set("", doc.clone()),
            Err(MemcacheError::KeyRequired)
        ));
        rooms.set("lobby", doc.clone()).unwrap();
        assert!(rooms.get("lobby").unwrap().ptr_eq(&doc));

        let removed = rooms.remove("lobby").unwrap();
        assert_eq!(removed.get_as::<String>("topic").unwrap(), "general");
        assert!(rooms.remove("lobby").is_none());
    }

    #[test]
    fn concurrent_document_creation_yields_one_child() {
        let rooms = Collection::new("rooms");
        let barrier = Arc::new(Barrier::new(10));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let rooms = rooms.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..10).map(|_| rooms.document("x")).collect::<Vec<_>>()
                })
            })
            .collect();

        let docs: Vec<Document> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread should not panic"))
            .collect();
        assert_eq!(docs.len(), 100);
        assert_eq!(rooms.len(), 1);

        // Write through one handle, read through every other.
        docs[0].set("shared", &99u16).unwrap();
        for doc in &docs {
            assert_eq!(doc.get("shared").decode::<u16>().unwrap(), 99);
        }
    }
}
