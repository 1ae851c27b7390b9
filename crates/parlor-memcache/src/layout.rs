//! On-disk layout shared by [`Datastore`](crate::Datastore) and
//! [`DocumentStore`](crate::DocumentStore).
//!
//! Directory-mirrored format:
//!
//! ```text
//! root/
//!   .parlor-layout                  "collections v1" | "documents v1"
//!   <collection>/                   (collections layout only)
//!     <document>/
//!       <entry key>                 base64(serialized value bytes)
//! ```
//!
//! Depth is fixed by the layout: entries live at depth 3 under the
//! collections layout and at depth 2 under the documents layout. A
//! directory at or below the entry depth, a file above it, or anything that
//! is neither file nor directory is a structural error.

use std::collections::HashSet;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::document::{Document, DocumentReader};
use crate::error::{MemcacheError, Result};
use crate::item::Item;
use crate::names::validate_name;

/// Name of the marker file written at the datastore root.
pub const LAYOUT_FILE: &str = ".parlor-layout";

/// Current version of the directory layout.
pub const LAYOUT_VERSION: u32 = 1;

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Which hierarchy a datastore tree uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// `root/<collection>/<document>/<entry>`.
    #[default]
    Collections,
    /// `root/<document>/<entry>`.
    Documents,
}

impl LayoutKind {
    /// Depth (relative to the root) at which entry files live.
    pub fn entry_depth(self) -> usize {
        match self {
            Self::Collections => 3,
            Self::Documents => 2,
        }
    }

    fn marker_name(self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Documents => "documents",
        }
    }

    fn marker(self) -> String {
        format!("{} v{LAYOUT_VERSION}\n", self.marker_name())
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker_name())
    }
}

impl std::str::FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "collections" => Ok(Self::Collections),
            "documents" => Ok(Self::Documents),
            other => Err(format!("unknown layout: {other}")),
        }
    }
}

/// Something found while walking a datastore tree.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Node {
    /// A container directory; `path` holds its names from the root down.
    Container { path: Vec<String> },
    /// An entry file inside the innermost container.
    Entry { path: Vec<String>, item: Item },
}

/// Outcome of preparing a root directory for loading.
pub(crate) enum Root {
    /// The directory did not exist and was created empty.
    Created,
    /// The directory exists and may hold data.
    Existing,
}

/// Make sure `root` is a usable directory, creating it if missing.
pub(crate) fn prepare_root(root: &Path) -> Result<Root> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(Root::Existing),
        Ok(_) => Err(MemcacheError::InvalidPath(root.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            ensure_dir(root)?;
            debug!(path = %root.display(), "created empty datastore root");
            Ok(Root::Created)
        }
        Err(e) => Err(MemcacheError::io(root, e)),
    }
}

/// Check the layout marker, if one exists.
///
/// Trees written before the marker existed carry none and are accepted.
pub(crate) fn check_marker(root: &Path, kind: LayoutKind) -> Result<()> {
    let path = root.join(LAYOUT_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(MemcacheError::io(path, e)),
    };

    let mismatch = |reason: String| MemcacheError::Layout {
        path: path.clone(),
        reason,
    };

    let mut parts = content.split_whitespace();
    let (Some(name), Some(version), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(mismatch(format!("unreadable marker {:?}", content.trim())));
    };
    if name != kind.marker_name() {
        return Err(mismatch(format!("tree uses the {name} layout, expected {kind}")));
    }
    if version != format!("v{LAYOUT_VERSION}") {
        return Err(mismatch(format!("unsupported layout version {version}")));
    }
    Ok(())
}

/// Make sure `root` may be overwritten with a `kind` tree.
///
/// Flushing prunes whatever is not in memory, so it must only ever run on
/// a tree it owns: a missing or empty directory, a tree marked with the
/// same layout, or an unmarked tree that already has the shape of `kind`.
/// A marker naming another layout is a [`MemcacheError::Layout`]; any other
/// content is a [`MemcacheError::Structure`].
pub(crate) fn claim_root(root: &Path, kind: LayoutKind) -> Result<()> {
    if let Root::Created = prepare_root(root)? {
        return Ok(());
    }
    let marked = fs::symlink_metadata(root.join(LAYOUT_FILE))
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if marked {
        return check_marker(root, kind);
    }
    walk(root, kind, |_| Ok(()))
}

/// Walk `root` and hand every container and entry to `visit`, parents
/// before children. Aborts on the first structural or I/O error.
pub(crate) fn walk<F>(root: &Path, kind: LayoutKind, mut visit: F) -> Result<()>
where
    F: FnMut(Node) -> Result<()>,
{
    let entry_depth = kind.entry_depth();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let depth = entry.depth();
        let file_type = entry.file_type();

        if depth == 1 && file_type.is_file() && entry.file_name() == LAYOUT_FILE {
            continue;
        }

        let path = relative_names(root, entry.path())?;

        if file_type.is_dir() {
            if depth >= entry_depth {
                return Err(MemcacheError::structure(
                    entry.path(),
                    format!("directory nested deeper than the {kind} layout allows"),
                ));
            }
            visit(Node::Container { path })?;
        } else if file_type.is_file() {
            if depth != entry_depth {
                return Err(MemcacheError::structure(
                    entry.path(),
                    format!("file at depth {depth}, entries belong at depth {entry_depth}"),
                ));
            }
            let item = read_entry(entry.path())?;
            visit(Node::Entry { path, item })?;
        } else {
            return Err(MemcacheError::structure(
                entry.path(),
                "neither a regular file nor a directory",
            ));
        }
    }
    Ok(())
}

// Component names of `path` below `root`, each validated.
fn relative_names(root: &Path, path: &Path) -> Result<Vec<String>> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| MemcacheError::structure(path, "path escapes the datastore root"))?;

    relative
        .iter()
        .map(|component| {
            let name = component.to_str().ok_or_else(|| MemcacheError::InvalidName {
                name: component.to_string_lossy().into_owned(),
                reason: "not valid UTF-8".into(),
            })?;
            validate_name(name)?;
            Ok(name.to_string())
        })
        .collect()
}

fn read_entry(path: &Path) -> Result<Item> {
    let text = fs::read(path).map_err(|e| MemcacheError::io(path, e))?;
    let value = STANDARD
        .decode(text.trim_ascii_end())
        .map_err(|source| MemcacheError::Base64 {
            path: path.to_path_buf(),
            source,
        })?;
    let key = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(Item { key, value })
}

/// Create `path` and any missing parents with owner-only permissions.
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
        .create(path)
        .map_err(|e| MemcacheError::io(path, e))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut file = options.open(path).map_err(|e| MemcacheError::io(path, e))?;
    file.write_all(contents)
        .map_err(|e| MemcacheError::io(path, e))
}

/// Write the layout marker at `root`.
pub(crate) fn write_marker(root: &Path, kind: LayoutKind) -> Result<()> {
    write_file(&root.join(LAYOUT_FILE), kind.marker().as_bytes())
}

/// Counters reported by a flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    pub collections: usize,
    pub documents: usize,
    pub entries: usize,
    /// Stale files and directories removed because they are no longer in
    /// memory.
    pub pruned: usize,
}

/// A document captured for flushing: its key and a snapshot of its items.
pub(crate) struct DocumentSnapshot {
    pub name: String,
    pub items: Vec<Item>,
}

impl DocumentSnapshot {
    pub(crate) fn capture(name: String, document: &Document) -> Self {
        Self {
            name,
            items: document.get_all(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_name(&self.name)
            .and_then(|()| {
                self.items
                    .iter()
                    .try_for_each(|item| validate_name(&item.key))
            })
            .inspect_err(|e| warn!(document = %self.name, error = %e, "flush refused"))
    }
}

/// Write `documents` under `dir`, one subdirectory each, then remove
/// anything under `dir` that is not part of the snapshot.
pub(crate) fn write_documents(
    dir: &Path,
    documents: &[DocumentSnapshot],
    keep_marker: bool,
    stats: &mut FlushStats,
) -> Result<()> {
    for document in documents {
        let doc_dir = dir.join(&document.name);
        ensure_dir(&doc_dir)?;
        for item in &document.items {
            let encoded = STANDARD.encode(&item.value);
            write_file(&doc_dir.join(&item.key), encoded.as_bytes())?;
        }
        let keep: HashSet<&str> = document.items.iter().map(|i| i.key.as_str()).collect();
        stats.pruned += prune(&doc_dir, &keep, false)?;
        stats.documents += 1;
        stats.entries += document.items.len();
    }

    let keep: HashSet<&str> = documents.iter().map(|d| d.name.as_str()).collect();
    stats.pruned += prune(dir, &keep, keep_marker)?;
    Ok(())
}

/// Remove every child of `dir` whose name is not in `keep`.
pub(crate) fn prune(dir: &Path, keep: &HashSet<&str>, keep_marker: bool) -> Result<usize> {
    let mut removed = 0;
    let children = fs::read_dir(dir).map_err(|e| MemcacheError::io(dir, e))?;
    for child in children {
        let child = child.map_err(|e| MemcacheError::io(dir, e))?;
        let name = child.file_name();
        let name = name.to_string_lossy();
        if keep.contains(name.as_ref()) || (keep_marker && name == LAYOUT_FILE) {
            continue;
        }

        let path = child.path();
        let file_type = child.file_type().map_err(|e| MemcacheError::io(&path, e))?;
        let result = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| MemcacheError::io(&path, e))?;
        debug!(path = %path.display(), "pruned stale datastore path");
        removed += 1;
    }
    Ok(removed)
}
