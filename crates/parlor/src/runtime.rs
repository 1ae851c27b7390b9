//! The [`Parlor`] runtime bundle: the datastore and the credential cache a
//! chat service holds for its whole lifetime.

use std::path::Path;

use parlor_auth::{Credential, CredentialCache};
use parlor_memcache::{Datastore, DocumentStore, FlushStats, LayoutKind};
use tracing::info;

use crate::config::ParlorConfig;
use crate::error::ParlorResult;

/// A datastore in either layout.
#[derive(Debug)]
pub enum Store {
    Collections(Datastore),
    Documents(DocumentStore),
}

impl Store {
    pub fn new(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::Collections => Self::Collections(Datastore::new()),
            LayoutKind::Documents => Self::Documents(DocumentStore::new()),
        }
    }

    /// Rebuild a store of the given layout from `path`.
    pub fn open(path: impl AsRef<Path>, kind: LayoutKind) -> parlor_memcache::Result<Self> {
        Ok(match kind {
            LayoutKind::Collections => Self::Collections(Datastore::open(path)?),
            LayoutKind::Documents => Self::Documents(DocumentStore::open(path)?),
        })
    }

    pub fn kind(&self) -> LayoutKind {
        match self {
            Self::Collections(_) => LayoutKind::Collections,
            Self::Documents(_) => LayoutKind::Documents,
        }
    }

    pub fn as_datastore(&self) -> Option<&Datastore> {
        match self {
            Self::Collections(store) => Some(store),
            Self::Documents(_) => None,
        }
    }

    pub fn as_document_store(&self) -> Option<&DocumentStore> {
        match self {
            Self::Documents(store) => Some(store),
            Self::Collections(_) => None,
        }
    }

    pub fn flush(&self, path: impl AsRef<Path>) -> parlor_memcache::Result<FlushStats> {
        match self {
            Self::Collections(store) => store.flush(path),
            Self::Documents(store) => store.flush(path),
        }
    }

    pub fn close(self, path: impl AsRef<Path>) -> parlor_memcache::Result<FlushStats> {
        match self {
            Self::Collections(store) => store.close(path),
            Self::Documents(store) => store.close(path),
        }
    }
}

/// Process-lifetime state for a chat service.
///
/// Opened once at startup and closed once at shutdown. Between the two,
/// request handlers share it by reference.
pub struct Parlor {
    config: ParlorConfig,
    store: Store,
    credentials: CredentialCache<String>,
}

impl Parlor {
    /// Validate `config`, rehydrate the datastore from `data_dir` (if any)
    /// and start an empty credential cache.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime; the credential cache
    /// schedules its expiry timers there.
    pub fn open(config: ParlorConfig) -> ParlorResult<Self> {
        config.validate()?;
        let store = match &config.data_dir {
            Some(dir) => Store::open(dir, config.layout)?,
            None => Store::new(config.layout),
        };
        info!(
            data_dir = ?config.data_dir,
            layout = %config.layout,
            "parlor opened"
        );
        Ok(Self {
            config,
            store,
            credentials: CredentialCache::new(),
        })
    }

    pub fn config(&self) -> &ParlorConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn credentials(&self) -> &CredentialCache<String> {
        &self.credentials
    }

    /// Generate a credential for `identity` with the configured token length
    /// and lifetime, and register it under `key`.
    pub fn issue_credential(
        &self,
        key: impl Into<String>,
        identity: impl Into<String>,
    ) -> ParlorResult<Credential<String>> {
        let credential = Credential::generate(
            self.config.token_length,
            self.config.credential_ttl(),
            identity.into(),
        )?;
        self.credentials.register_key(key, credential.clone())?;
        Ok(credential)
    }

    /// Issue a credential keyed by its own token, as a login session would.
    pub fn issue_session(&self, identity: impl Into<String>) -> ParlorResult<Credential<String>> {
        let credential = Credential::generate(
            self.config.token_length,
            self.config.credential_ttl(),
            identity.into(),
        )?;
        self.credentials
            .register_key(credential.token(), credential.clone())?;
        Ok(credential)
    }

    /// Resolve a presented secret to the identity it authenticates.
    pub fn authenticate(&self, secret: &str) -> Option<String> {
        self.credentials
            .lookup(secret)
            .map(|(_, credential)| credential.into_payload())
    }

    /// Snapshot the datastore to `data_dir`. Returns `None` when running
    /// memory-only.
    pub fn flush(&self) -> ParlorResult<Option<FlushStats>> {
        match &self.config.data_dir {
            Some(dir) => Ok(Some(self.store.flush(dir)?)),
            None => Ok(None),
        }
    }

    /// Flush and shut down. Outstanding credentials are dropped with the
    /// cache.
    pub fn close(self) -> ParlorResult<Option<FlushStats>> {
        let stats = match &self.config.data_dir {
            Some(dir) => Some(self.store.close(dir)?),
            None => None,
        };
        info!(flushed = stats.is_some(), "parlor closed");
        Ok(stats)
    }
}

impl std::fmt::Debug for Parlor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parlor")
            .field("layout", &self.store.kind())
            .field("data_dir", &self.config.data_dir)
            .field("credential_count", &self.credentials.len())
            .finish()
    }
}
