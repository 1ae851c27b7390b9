use std::path::PathBuf;

use parlor_auth::AuthError;
use parlor_memcache::MemcacheError;
use thiserror::Error;

/// Errors from configuring or running a [`Parlor`](crate::Parlor).
#[derive(Debug, Error)]
pub enum ParlorError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    RenderConfig(#[from] toml::ser::Error),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Memcache(#[from] MemcacheError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Result alias for runtime operations.
pub type ParlorResult<T> = Result<T, ParlorError>;
