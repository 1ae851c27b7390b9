//! Flat variant of the datastore: documents directly under the root, with
//! no collection level.

use std::path::Path;

use tracing::info;

use crate::collection::Collection;
use crate::document::Document;
use crate::error::{MemcacheError, Result};
use crate::layout::{self, DocumentSnapshot, FlushStats, LayoutKind, Node, Root};

/// Root container owning [`Document`]s keyed by name.
///
/// On disk this is `root/<document>/<entry>`. Suited to services that keep
/// one document per entity (one per user, one per room).
pub struct DocumentStore {
    documents: Collection,
}

impl DocumentStore {
    /// Create an empty store with no disk backing.
    pub fn new() -> Self {
        Self {
            documents: Collection::new(""),
        }
    }

    /// Rebuild a store from the tree at `path`, creating `path` if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        let store = Self::new();

        if let Root::Created = layout::prepare_root(root)? {
            info!(path = %root.display(), "initialized empty document store");
            return Ok(store);
        }

        layout::check_marker(root, LayoutKind::Documents)?;
        layout::walk(root, LayoutKind::Documents, |node| match node {
            Node::Container { path } => match path.as_slice() {
                [document] => {
                    store.document(document);
                    Ok(())
                }
                _ => Err(MemcacheError::structure(root, "unexpected container")),
            },
            Node::Entry { path, item } => match path.as_slice() {
                [document, _] => store.document(document).set_raw(&item.key, item.value),
                _ => Err(MemcacheError::structure(root, "unexpected entry")),
            },
        })?;

        info!(
            path = %root.display(),
            documents = store.len(),
            "opened document store"
        );
        Ok(store)
    }

    /// Return the document called `name`, creating it if absent.
    pub fn document(&self, name: &str) -> Document {
        self.documents.document(name)
    }

    /// Return the document called `name` without creating it.
    pub fn get(&self, name: &str) -> Option<Document> {
        self.documents.get(name)
    }

    /// Snapshot of every document, in no particular order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.documents()
    }

    /// Drop the document called `name`, returning it if it existed.
    pub fn remove_document(&self, name: &str) -> Option<Document> {
        self.documents.remove(name)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Write a full snapshot to `path`. Same mirroring and failure rules as
    /// [`Datastore::flush`](crate::Datastore::flush).
    pub fn flush(&self, path: impl AsRef<Path>) -> Result<FlushStats> {
        let root = path.as_ref();

        let snapshot: Vec<DocumentSnapshot> = self
            .documents
            .entries()
            .into_iter()
            .map(|(name, document)| DocumentSnapshot::capture(name, &document))
            .collect();
        snapshot.iter().try_for_each(DocumentSnapshot::validate)?;

        layout::claim_root(root, LayoutKind::Documents)?;
        layout::write_marker(root, LayoutKind::Documents)?;

        let mut stats = FlushStats::default();
        layout::write_documents(root, &snapshot, true, &mut stats)?;

        info!(
            path = %root.display(),
            documents = stats.documents,
            entries = stats.entries,
            pruned = stats.pruned,
            "flushed document store"
        );
        Ok(stats)
    }

    /// Flush to `path` and consume the store.
    pub fn close(self, path: impl AsRef<Path>) -> Result<FlushStats> {
        self.flush(path)
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("document_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentReader, DocumentWriter};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn close_then_open_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::new();
        for user in ["alice", "bob"] {
            let doc = store.document(user);
            doc.set("nickname", &user.to_uppercase()).unwrap();
            doc.set("rooms", &vec!["lobby".to_string()]).unwrap();
        }
        let stats = store.close(tmp.path()).unwrap();
        assert_eq!(stats.collections, 0);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.entries, 4);

        let reopened = DocumentStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        let bob = reopened.get("bob").unwrap();
        assert_eq!(bob.get_as::<String>("nickname").unwrap(), "BOB");
        assert_eq!(bob.get_as::<Vec<String>>("rooms").unwrap(), vec!["lobby"]);
    }

    #[test]
    fn open_rejects_three_level_tree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("users/alice/profile")).unwrap();
        assert!(matches!(
            DocumentStore::open(tmp.path()),
            Err(MemcacheError::Structure { .. })
        ));
    }

    #[test]
    fn open_rejects_collections_layout_tree() {
        let tmp = TempDir::new().unwrap();
        crate::Datastore::new().flush(tmp.path()).unwrap();
        assert!(matches!(
            DocumentStore::open(tmp.path()),
            Err(MemcacheError::Layout { .. })
        ));
    }

    #[test]
    fn flush_keeps_marker_and_prunes_documents() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::new();
        store.document("a").set("k", &1u8).unwrap();
        store.document("b").set("k", &2u8).unwrap();
        store.flush(tmp.path()).unwrap();

        store.remove_document("a");
        let stats = store.flush(tmp.path()).unwrap();
        assert_eq!(stats.pruned, 1);
        assert!(tmp.path().join(layout::LAYOUT_FILE).exists());
        assert!(!tmp.path().join("a").exists());

        let reopened = DocumentStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.get("b").unwrap().get("k").decode::<u8>().unwrap(), 2);
        assert!(reopened.get("a").is_none());
    }

    #[test]
    fn flush_refuses_collections_layout_tree() {
        let tmp = TempDir::new().unwrap();
        let ds = crate::Datastore::new();
        ds.collection("users").document("alice").set("nick", "al").unwrap();
        ds.flush(tmp.path()).unwrap();

        let store = DocumentStore::new();
        store.document("bob").set("nick", "bo").unwrap();
        assert!(matches!(
            store.flush(tmp.path()),
            Err(MemcacheError::Layout { .. })
        ));
        assert!(tmp.path().join("users/alice/nick").is_file());
        assert!(!tmp.path().join("bob").exists());
    }

    #[test]
    fn document_is_get_or_create() {
        let store = DocumentStore::new();
        assert!(store.document("x").ptr_eq(&store.document("x")));
        assert_eq!(store.documents().len(), 1);
    }
}
