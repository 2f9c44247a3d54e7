//! The [`Record`] trait and relationship-graph traversal.
//!
//! A `Record` is a persisted row type: it knows its table, its primary key,
//! its static relationship metadata, and how to expose its navigation fields
//! to a [`LinkWalker`]. The walker is the monomorphized seam between a record
//! struct and the cascade engine: the engine implements `LinkWalker` once,
//! and each record's `walk` hands it every navigation field in declaration
//! order with full static typing, so there is no per-field reflection and no
//! trait objects on the hot path.

use crate::blob::BlobCodec;
use crate::error::Result;
use crate::key::Key;
use crate::relationship::RelationshipInfo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};

/// A shared, mutable handle to an in-memory record.
///
/// Graph hydration and graph writes both operate on shared handles so that a
/// record reached through two paths is the same object, not two copies.
pub type Ref<T> = Arc<RwLock<T>>;

/// Wrap a record in a shared handle.
pub fn new_ref<T>(value: T) -> Ref<T> {
    Arc::new(RwLock::new(value))
}

/// A to-one navigation field, borrowed out of a record for traversal.
pub struct SingleLink<'a, T: Record> {
    /// The relationship declaration this field corresponds to.
    pub info: &'static RelationshipInfo,
    /// The foreign-key column on the owning record, when the FK lives here.
    /// `None` for relationships whose FK lives on the related record.
    pub fk: Option<&'a mut Key>,
    /// The navigation slot itself.
    pub nav: &'a mut Option<Ref<T>>,
}

/// A to-many navigation field, borrowed out of a record for traversal.
pub struct ManyLink<'a, T: Record> {
    /// The relationship declaration this field corresponds to.
    pub info: &'static RelationshipInfo,
    /// The navigation slot itself.
    pub nav: &'a mut Vec<Ref<T>>,
}

/// Visitor over a record's navigation fields.
///
/// Implementations decide per field whether to follow, populate, or ignore
/// it; `Record::walk` merely enumerates the fields in declaration order.
pub trait LinkWalker: Sized {
    type Error;

    /// Visit a to-one navigation field.
    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> std::result::Result<(), Self::Error>;

    /// Visit a to-many navigation field.
    fn many<T: Record>(&mut self, link: ManyLink<'_, T>) -> std::result::Result<(), Self::Error>;
}

/// A persisted row type with relationship metadata.
///
/// Key and foreign-key fields are [`Key`]-typed struct fields that serialize
/// into the row; navigation fields are `Option<Ref<T>>` / `Vec<Ref<T>>` and
/// carry `#[serde(skip)]`. Implementations are normally generated, but the
/// trait is written to be implementable by hand.
pub trait Record:
    Serialize + DeserializeOwned + Send + Sync + Sized + 'static
{
    /// Table name.
    const TABLE: &'static str;

    /// Primary-key column name.
    const PRIMARY_KEY: &'static str;

    /// Whether the backend assigns the primary key on insert when it is
    /// [`Key::None`].
    const AUTO_KEY: bool = false;

    /// Static relationship declarations for this type.
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[];

    /// The current primary-key value.
    fn key(&self) -> Key;

    /// Overwrite the primary-key value (used after auto-key assignment).
    fn set_key(&mut self, key: Key);

    /// Read a foreign-key column by name. Returns [`Key::None`] for columns
    /// this type does not carry.
    fn foreign_key(&self, column: &str) -> Key {
        let _ = column;
        Key::None
    }

    /// Write a foreign-key column by name. Columns this type does not carry
    /// are ignored.
    fn set_foreign_key(&mut self, column: &str, key: Key) {
        let _ = (column, key);
    }

    /// Hand each navigation field to the walker, in the order the fields are
    /// declared in [`Record::RELATIONSHIPS`].
    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        let _ = walker;
        Ok(())
    }

    /// Encode structured fields into their text-column form before the row
    /// is written. Default: no blob fields.
    fn encode_blobs<C: BlobCodec>(&mut self, codec: &C) -> Result<()> {
        let _ = codec;
        Ok(())
    }

    /// Decode text-column blob fields into structured form after the row is
    /// read. Default: no blob fields.
    fn decode_blobs<C: BlobCodec>(&mut self, codec: &C) -> Result<()> {
        let _ = codec;
        Ok(())
    }
}
