//! Expiring credential cache for the Parlor chat backend.
//!
//! A [`Credential`] pairs an opaque random token with the identity it
//! authenticates and an expiry instant. The [`CredentialCache`] keeps
//! registered credentials until they expire or are revoked, evicting them
//! with one Tokio timer task per registration.
//!
//! ```no_run
//! # async fn demo() -> parlor_auth::AuthResult<()> {
//! use std::time::Duration;
//! use parlor_auth::{Credential, CredentialCache};
//!
//! let cache = CredentialCache::new();
//! let cred = Credential::generate(32, Duration::from_secs(3600), "alice".to_string())?;
//! let token = cred.token().to_string();
//! cache.register_key(token.clone(), cred)?;
//! assert_eq!(cache.retrieve_key(&token).map(|c| c.into_payload()), Some("alice".into()));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod credential;
pub mod error;

pub use cache::CredentialCache;
pub use credential::{generate_token, Credential};
pub use error::{AuthError, AuthResult};
