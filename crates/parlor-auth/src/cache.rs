//! The [`CredentialCache`]: registered credentials with scheduled expiry.
//!
//! Per-credential lifecycle:
//!
//! ```text
//! absent ──register──▶ active ──revoke──▶ revoked
//!                        │
//!                        └──expiry──▶ expired
//! ```
//!
//! Every registration gets a fresh generation number and its own Tokio task
//! that sleeps until expiry. The task's [`AbortHandle`] is stored with the
//! registration and aborted on revocation or replacement. The task only
//! evicts the entry if the stored generation is still its own, so a timer
//! left over from an earlier registration can never evict a newer one.
//! The task is armed only after its registration is stored, so it always
//! finds the entry it was scheduled for. Lookups re-check expiry themselves
//! and never rely on the timer having run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parlor_store::KeyedStore;
use subtle::ConstantTimeEq;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::credential::Credential;
use crate::error::{AuthError, AuthResult};

struct Registration<P> {
    credential: Credential<P>,
    generation: u64,
    eviction: AbortHandle,
}

impl<P: Clone> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Self {
            credential: self.credential.clone(),
            generation: self.generation,
            eviction: self.eviction.clone(),
        }
    }
}

struct CacheInner<P> {
    registrations: KeyedStore<String, Registration<P>>,
    next_generation: AtomicU64,
    runtime: Handle,
}

impl<P> CacheInner<P> {
    // Remove `key` only if it still holds `generation`.
    fn evict(&self, key: &str, generation: u64) -> bool {
        match self
            .registrations
            .remove_if(&key.to_string(), |r| r.generation == generation)
        {
            Some(registration) => {
                registration.eviction.abort();
                true
            }
            None => false,
        }
    }
}

impl<P> Drop for CacheInner<P> {
    fn drop(&mut self) {
        self.registrations.retain(|_, registration| {
            registration.eviction.abort();
            false
        });
    }
}

/// Thread-safe store of expiring credentials keyed by an arbitrary string
/// (the token itself, or the identity it belongs to).
///
/// `CredentialCache` is cheaply cloneable; clones share the same entries.
pub struct CredentialCache<P> {
    inner: Arc<CacheInner<P>>,
}

impl<P> Clone for CredentialCache<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> CredentialCache<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Create an empty cache whose eviction tasks run on the current Tokio
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime. Use
    /// [`with_handle`](Self::with_handle) to supply one explicitly.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Create an empty cache whose eviction tasks run on `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                registrations: KeyedStore::new(),
                next_generation: AtomicU64::new(0),
                runtime,
            }),
        }
    }

    /// Store `credential` under `key` and schedule its eviction.
    ///
    /// Fails without storing anything if the credential has already
    /// expired. Registering over an existing key replaces it; the newest
    /// registration wins and the old eviction is cancelled.
    pub fn register_key(&self, key: impl Into<String>, credential: Credential<P>) -> AuthResult<()> {
        let key = key.into();
        if !credential.is_valid() {
            warn!(key = %key, "refusing to register expired credential");
            return Err(AuthError::AlreadyExpired { key });
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (arm, armed) = oneshot::channel();
        let eviction =
            self.schedule_eviction(key.clone(), generation, credential.expires_at(), armed);
        let registration = Registration {
            credential,
            generation,
            eviction,
        };

        if let Some(previous) = self.inner.registrations.insert(key.clone(), registration) {
            previous.eviction.abort();
            debug!(key = %key, "replaced existing credential");
        }
        // The timer only starts once the entry it evicts is in place.
        let _ = arm.send(());
        debug!(key = %key, generation, "registered credential");
        Ok(())
    }

    fn schedule_eviction(
        &self,
        key: String,
        generation: u64,
        deadline: Instant,
        armed: oneshot::Receiver<()>,
    ) -> AbortHandle {
        let cache: Weak<CacheInner<P>> = Arc::downgrade(&self.inner);
        let task = self.inner.runtime.spawn(async move {
            if armed.await.is_err() {
                return;
            }
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = cache.upgrade() {
                if inner.evict(&key, generation) {
                    debug!(key = %key, generation, "evicted expired credential");
                }
            }
        });
        task.abort_handle()
    }

    /// Look up the credential under `key`.
    ///
    /// Returns `None` for unknown, revoked and expired keys alike. An entry
    /// found past its expiry is removed on the spot.
    pub fn retrieve_key(&self, key: &str) -> Option<Credential<P>> {
        let registration = self.inner.registrations.get(&key.to_string())?;
        if registration.credential.is_valid() {
            return Some(registration.credential);
        }
        self.inner.evict(key, registration.generation);
        None
    }

    /// Remove the credential under `key` and cancel its eviction.
    ///
    /// Returns `true` if a credential was removed.
    pub fn revoke_key(&self, key: &str) -> bool {
        match self.inner.registrations.remove(&key.to_string()) {
            Some(registration) => {
                registration.eviction.abort();
                debug!(key, "revoked credential");
                true
            }
            None => false,
        }
    }

    /// Find the active credential whose token equals `secret`, with its key.
    ///
    /// Scans every registration and compares tokens in constant time, so
    /// the time taken does not reveal how much of `secret` matched.
    pub fn lookup(&self, secret: &str) -> Option<(String, Credential<P>)> {
        let now = Instant::now();
        let secret = secret.as_bytes();
        let mut found = None;

        for (key, registration) in self.inner.registrations.entries() {
            let matches: bool = registration
                .credential
                .token()
                .as_bytes()
                .ct_eq(secret)
                .into();
            if matches && found.is_none() && registration.credential.is_valid_at(now) {
                found = Some((key, registration.credential));
            }
        }
        found
    }

    /// Remove every registration whose expiry has passed.
    ///
    /// Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.inner.registrations.retain(|_, registration| {
            let keep = registration.credential.is_valid_at(now);
            if !keep {
                registration.eviction.abort();
            }
            keep
        })
    }

    /// Number of stored registrations, including expired ones not yet
    /// evicted.
    pub fn len(&self) -> usize {
        self.inner.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registrations.is_empty()
    }
}

impl<P> std::fmt::Debug for CredentialCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("registration_count", &self.inner.registrations.len())
            .finish()
    }
}
