use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::time::Instant;

use crate::error::{AuthError, AuthResult};

/// Generate a random token of `len` characters from `[a-zA-Z0-9]`.
///
/// Uses the thread-local CSPRNG, seeded from the operating system.
pub fn generate_token(len: usize) -> AuthResult<String> {
    if len == 0 {
        return Err(AuthError::EmptyToken);
    }
    Ok(rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect())
}

/// An opaque token, the identity it authenticates, and when it stops being
/// valid.
///
/// Expiry is measured on Tokio's clock so that paused-time tests and the
/// eviction timers agree.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential<P> {
    token: String,
    payload: P,
    expires_at: Instant,
}

impl<P> Credential<P> {
    pub fn new(token: impl Into<String>, payload: P, expires_at: Instant) -> Self {
        Self {
            token: token.into(),
            payload,
            expires_at,
        }
    }

    /// Issue a credential with a freshly generated token of `len` characters,
    /// valid for `ttl` from now.
    ///
    /// Fails with [`AuthError::TtlTooLong`] if `now + ttl` overflows the
    /// clock.
    pub fn generate(len: usize, ttl: Duration, payload: P) -> AuthResult<Self> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(AuthError::TtlTooLong { ttl })?;
        let token = generate_token(len)?;
        Ok(Self::new(token, payload, expires_at))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// A credential is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for Credential<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("payload", &self.payload)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_alphanumeric() {
        let token = generate_token(64).unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token(64).unwrap());
    }

    #[test]
    fn zero_length_token_is_rejected() {
        assert_eq!(generate_token(0), Err(AuthError::EmptyToken));
        assert!(Credential::generate(0, Duration::from_secs(1), ()).is_err());
    }

    #[test]
    fn validity_is_strictly_before_expiry() {
        let now = Instant::now();
        let cred = Credential::new("t", "alice", now + Duration::from_secs(1));
        assert!(cred.is_valid_at(now));
        assert!(!cred.is_valid_at(now + Duration::from_secs(1)));
        assert!(!cred.is_valid_at(now + Duration::from_secs(2)));
    }

    #[test]
    fn generate_sets_expiry_from_ttl() {
        let cred = Credential::generate(16, Duration::from_secs(60), 7u32).unwrap();
        assert_eq!(cred.token().len(), 16);
        assert_eq!(*cred.payload(), 7);
        assert!(cred.is_valid());
        assert!(cred.remaining() <= Duration::from_secs(60));
        assert_eq!(cred.into_payload(), 7);
    }

    #[test]
    fn overflowing_ttl_is_rejected() {
        assert_eq!(
            Credential::generate(16, Duration::MAX, ()),
            Err(AuthError::TtlTooLong { ttl: Duration::MAX })
        );
        let ttl = Duration::from_secs(i64::MAX as u64);
        assert!(matches!(
            Credential::generate(16, ttl, ()),
            Err(AuthError::TtlTooLong { .. })
        ));
    }

    #[test]
    fn expired_credential_has_no_time_left() {
        let cred = Credential::new("t", (), Instant::now());
        assert!(!cred.is_valid());
        assert_eq!(cred.remaining(), Duration::ZERO);
    }

    #[test]
    fn debug_redacts_token() {
        let cred = Credential::new("supersecret", "alice", Instant::now());
        let debug = format!("{cred:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("alice"));
    }
}
