use thiserror::Error;

/// Errors from credential cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The credential's expiry had already passed when it was registered.
    #[error("credential for {key} is already expired")]
    AlreadyExpired { key: String },

    /// The requested lifetime does not fit on the clock.
    #[error("credential lifetime of {}s is too long", .ttl.as_secs())]
    TtlTooLong { ttl: std::time::Duration },

    /// A token length of zero was requested.
    #[error("token length must be at least 1")]
    EmptyToken,
}

/// Result alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
