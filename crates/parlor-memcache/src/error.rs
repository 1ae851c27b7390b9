use std::path::PathBuf;

/// Errors from document, collection and datastore operations.
#[derive(Debug, thiserror::Error)]
pub enum MemcacheError {
    /// An entry key was empty.
    #[error("memcache: key required")]
    KeyRequired,

    /// The value could not be serialized.
    #[error("memcache: could not encode value for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: bincode::Error,
    },

    /// The item holds bytes that do not decode as the requested type.
    #[error("memcache: could not decode {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: bincode::Error,
    },

    /// The item has no bytes: nothing was ever written under this key.
    #[error("memcache: decode of empty item {key:?}")]
    EmptyItem { key: String },

    /// The datastore root exists but is not a directory.
    #[error("memcache: path must be a directory: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The on-disk tree does not follow the expected layout.
    #[error("memcache: malformed datastore at {}: {reason}", .path.display())]
    Structure { path: PathBuf, reason: String },

    /// The layout marker names another layout or an unknown version.
    #[error("memcache: layout mismatch at {}: {reason}", .path.display())]
    Layout { path: PathBuf, reason: String },

    /// A collection, document or entry name cannot be used as a file name.
    #[error("memcache: invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// An entry file does not contain valid base64.
    #[error("memcache: invalid base64 in {}: {source}", .path.display())]
    Base64 {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },

    /// I/O failure on a specific path.
    #[error("memcache: I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure while walking the datastore tree.
    #[error("memcache: walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl MemcacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn structure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`MemcacheError::EmptyItem`].
    ///
    /// Callers usually treat an empty item as "not yet written" and a decode
    /// failure as corruption.
    pub fn is_empty_item(&self) -> bool {
        matches!(self, Self::EmptyItem { .. })
    }
}

/// Result alias for memcache operations.
pub type Result<T> = std::result::Result<T, MemcacheError>;
