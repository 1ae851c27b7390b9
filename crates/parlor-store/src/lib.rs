//! Thread-safe keyed storage for the Parlor chat backend.
//!
//! Every piece of application state (users, rooms, messages, sessions)
//! ultimately lives in a [`KeyedStore`]: a map guarded by a single mutex,
//! safe to share across request-handling threads without caller-side
//! locking.
//!
//! # Modules
//!
//! - [`keyed`] -- the [`KeyedStore`] primitive
//! - [`repository`] -- [`Repository`], a conflict-checked entity table
//! - [`traits`] -- the [`Reader`] / [`Writer`] contract consumed by handlers
//! - [`error`] -- [`RepoError`]

pub mod error;
pub mod keyed;
pub mod repository;
pub mod traits;

pub use error::{RepoError, Result};
pub use keyed::KeyedStore;
pub use repository::Repository;
pub use traits::{ReadWriter, Reader, Writer};
