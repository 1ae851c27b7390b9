//! The root of the collection → document → entry hierarchy.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parlor_store::KeyedStore;
use tracing::{info, warn};

use crate::collection::Collection;
use crate::error::{MemcacheError, Result};
use crate::layout::{self, DocumentSnapshot, FlushStats, LayoutKind, Node, Root};
use crate::names::validate_name;

/// Root container owning every [`Collection`].
///
/// A `Datastore` lives entirely in memory. [`open`](Self::open) rebuilds one
/// from a directory tree at startup and [`close`](Self::close) writes it
/// back at shutdown; nothing touches disk in between.
pub struct Datastore {
    collections: KeyedStore<String, Collection>,
}

impl Datastore {
    /// Create an empty datastore with no disk backing.
    pub fn new() -> Self {
        Self {
            collections: KeyedStore::new(),
        }
    }

    /// Rebuild a datastore from the tree at `path`.
    ///
    /// A missing `path` is created (with parents) and yields an empty
    /// datastore. Entry files are base64-decoded and stored verbatim; their
    /// bytes are not re-encoded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        let datastore = Self::new();

        if let Root::Created = layout::prepare_root(root)? {
            info!(path = %root.display(), "initialized empty datastore");
            return Ok(datastore);
        }

        layout::check_marker(root, LayoutKind::Collections)?;
        layout::walk(root, LayoutKind::Collections, |node| datastore.load(node))?;

        info!(
            path = %root.display(),
            collections = datastore.len(),
            "opened datastore"
        );
        Ok(datastore)
    }

    fn load(&self, node: Node) -> Result<()> {
        match node {
            Node::Container { path } => match path.as_slice() {
                [collection] => {
                    self.collection(collection);
                }
                [collection, document] => {
                    self.collection(collection).document(document);
                }
                _ => return Err(misplaced(&path)),
            },
            Node::Entry { path, item } => match path.as_slice() {
                [collection, document, _] => {
                    self.collection(collection)
                        .document(document)
                        .set_raw(&item.key, item.value)?;
                }
                _ => return Err(misplaced(&path)),
            },
        }
        Ok(())
    }

    /// Return the collection called `name`, creating it if absent.
    ///
    /// Concurrent calls with the same name always return handles to one
    /// collection.
    pub fn collection(&self, name: &str) -> Collection {
        self.collections
            .get_or_insert_with(name.to_string(), || Collection::new(name))
    }

    /// Return the collection called `name` without creating it.
    pub fn get(&self, name: &str) -> Option<Collection> {
        self.collections.get(&name.to_string())
    }

    /// Snapshot of every collection, in no particular order.
    pub fn collections(&self) -> Vec<Collection> {
        self.collections.values()
    }

    /// Drop the collection called `name`, returning it if it existed.
    pub fn remove_collection(&self, name: &str) -> Option<Collection> {
        self.collections.remove(&name.to_string())
    }

    /// Number of collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns `true` if the datastore holds no collections.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Write a full snapshot to `path`, leaving the datastore usable.
    ///
    /// Every name is validated before anything is written. Files and
    /// directories under `path` that no longer correspond to an entry,
    /// document or collection in memory are removed, so the tree mirrors
    /// memory exactly. The first I/O error aborts the flush; whatever was
    /// already written stays on disk.
    ///
    /// An existing `path` must be a datastore tree of this layout (or an
    /// empty directory); anything else is refused untouched with
    /// [`MemcacheError::Layout`] or [`MemcacheError::Structure`].
    pub fn flush(&self, path: impl AsRef<Path>) -> Result<FlushStats> {
        let root = path.as_ref();

        let snapshot: Vec<(String, Vec<DocumentSnapshot>)> = self
            .collections
            .entries()
            .into_iter()
            .map(|(name, collection)| {
                let documents = collection
                    .entries()
                    .into_iter()
                    .map(|(doc_name, document)| DocumentSnapshot::capture(doc_name, &document))
                    .collect();
                (name, documents)
            })
            .collect();

        for (name, documents) in &snapshot {
            validate_name(name)
                .inspect_err(|e| warn!(collection = %name, error = %e, "flush refused"))?;
            documents.iter().try_for_each(DocumentSnapshot::validate)?;
        }

        layout::claim_root(root, LayoutKind::Collections)?;
        layout::write_marker(root, LayoutKind::Collections)?;

        let mut stats = FlushStats::default();
        for (name, documents) in &snapshot {
            let dir = root.join(name);
            layout::ensure_dir(&dir)?;
            layout::write_documents(&dir, documents, false, &mut stats)?;
            stats.collections += 1;
        }
        let keep: HashSet<&str> = snapshot.iter().map(|(name, _)| name.as_str()).collect();
        stats.pruned += layout::prune(root, &keep, true)?;

        info!(
            path = %root.display(),
            collections = stats.collections,
            documents = stats.documents,
            entries = stats.entries,
            pruned = stats.pruned,
            "flushed datastore"
        );
        Ok(stats)
    }

    /// Flush to `path` and consume the datastore so no later write can be
    /// lost silently.
    pub fn close(self, path: impl AsRef<Path>) -> Result<FlushStats> {
        self.flush(path)
    }
}

fn misplaced(path: &[String]) -> MemcacheError {
    MemcacheError::structure(path.iter().collect::<PathBuf>(), "unexpected tree position")
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("collection_count", &self.len())
            .finish()
    }
}
