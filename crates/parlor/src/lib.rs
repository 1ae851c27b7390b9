//! Runtime bundle for the Parlor chat backend's state store.
//!
//! [`ParlorConfig`] says where state lives and how credentials are issued;
//! [`Parlor`] opens the datastore at startup, owns the credential cache for
//! the life of the process and snapshots the datastore on close.

pub mod config;
pub mod error;
pub mod runtime;

pub use config::{ParlorConfig, MAX_CREDENTIAL_TTL_SECS};
pub use error::{ParlorError, ParlorResult};
pub use runtime::{Parlor, Store};

pub use parlor_auth::{Credential, CredentialCache};
pub use parlor_memcache::{
    Collection, Datastore, Document, DocumentReader, DocumentStore, DocumentWriter, FlushStats,
    Item, LayoutKind, LAYOUT_FILE,
};
