//! Error types for repository operations.

use thiserror::Error;

/// Errors from [`Repository`](crate::Repository) operations.
///
/// The raw [`KeyedStore`](crate::KeyedStore) never fails; these are policy
/// errors layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    /// No value is stored under the requested key.
    #[error("no value found")]
    NotFound,

    /// A value is already stored under the key being created.
    #[error("value already exists")]
    Conflict,
}

/// Convenience type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;
