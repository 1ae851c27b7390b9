//! Collection/document store for the Parlor chat backend.
//!
//! Application entities are kept in memory as serialized entries grouped
//! into documents, and documents into collections. The whole hierarchy can
//! be snapshotted to a directory tree at shutdown and rebuilt from it at
//! startup.
//!
//! # Hierarchy
//!
//! - [`Datastore`] -- root; owns [`Collection`]s by name
//! - [`Collection`] -- owns [`Document`]s by name
//! - [`Document`] -- key → bincode-serialized value, read back as [`Item`]s
//! - [`DocumentStore`] -- flat variant with no collection level
//!
//! # Design Rules
//!
//! 1. Every container is guarded by its own single lock; handles are shared,
//!    never copied.
//! 2. Get-or-create on names is atomic: one name, one child.
//! 3. A never-written entry decodes as [`MemcacheError::EmptyItem`], never as
//!    a zero value.
//! 4. Disk is only touched by `open` and `flush`/`close`; the tree mirrors
//!    memory exactly after a flush (see [`layout`]).

pub mod collection;
pub mod datastore;
pub mod document;
pub mod error;
pub mod flat;
pub mod item;
pub mod layout;
pub mod names;

pub use collection::Collection;
pub use datastore::Datastore;
pub use document::{Document, DocumentReader, DocumentWriter};
pub use error::{MemcacheError, Result};
pub use flat::DocumentStore;
pub use item::Item;
pub use layout::{FlushStats, LayoutKind, LAYOUT_FILE, LAYOUT_VERSION};
pub use names::validate_name;
