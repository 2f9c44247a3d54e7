//! Core types and traits for relink.
//!
//! This crate defines the vocabulary the rest of the workspace is written
//! in: [`Key`] values, the [`Record`] trait and its [`LinkWalker`] traversal
//! seam, static [`RelationshipInfo`] metadata with its resolver, the
//! [`Store`] persistence abstraction, the [`BlobCodec`] text-column codec,
//! and the error taxonomy. It contains no engine logic and no backend.

pub mod blob;
pub mod error;
pub mod key;
pub mod record;
pub mod relationship;
pub mod store;

pub use blob::{BlobCodec, JsonCodec};
pub use error::{ConfigError, Error, Result, StorageError, StorageErrorKind};
pub use key::Key;
pub use record::{LinkWalker, ManyLink, Record, Ref, SingleLink, new_ref};
pub use relationship::{
    Cascade, LinkTableInfo, RelationshipInfo, RelationshipKind, find_relationship,
    relationships_of, resolve,
};
pub use store::Store;
