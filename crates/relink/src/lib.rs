//! relink - object-relationship cascades over row-oriented stores.
//!
//! relink layers graph semantics on top of flat row storage:
//!
//! - Static relationship metadata per record type, validated once
//! - Identity-tracked graph hydration that terminates on cycles
//! - Write cascades that order rows so foreign keys always resolve
//! - Link-table reconciliation for many-to-many relationships
//! - Text-blob encoding for structured columns
//!
//! # Quick Start
//!
//! ```ignore
//! use relink::prelude::*;
//! use relink_memory::MemoryStore;
//!
//! let db = Db::new(MemoryStore::new());
//! db.create_table::<Customer>()?;
//! db.create_table::<Order>()?;
//!
//! // Insert a customer together with its orders; orders get their
//! // customer_id filled in and written in the same sweep.
//! let customer = new_ref(Customer::named("ada"));
//! customer.write().unwrap().orders.push(new_ref(Order::amount(250)));
//! db.insert_with_children(&customer, true)?;
//!
//! // Hydrate the graph back; the orders' `customer` fields point at the
//! // very same shared handle.
//! let key = customer.read().unwrap().key();
//! let loaded = db.get_with_children::<Customer>(&key, true)?.unwrap();
//! ```
//!
//! The [`Db`] facade is synchronous at its core; every operation also has a
//! cancel-aware `_async` variant built on asupersync.

use relink_engine::{GraphReader, GraphWriter, IdentityTracker};

// asupersync re-exports, so callers of the async surface need no direct
// dependency.
pub use asupersync::{Cx, Outcome};

pub use relink_core::{
    BlobCodec, Cascade, ConfigError, Error, JsonCodec, Key, LinkTableInfo, LinkWalker, ManyLink,
    Record, Ref, RelationshipInfo, RelationshipKind, Result, SingleLink, StorageError,
    StorageErrorKind, Store, find_relationship, new_ref, relationships_of, resolve,
};
pub use relink_memory::MemoryStore;

/// Everything a typical caller needs.
pub mod prelude {
    pub use crate::Db;
    pub use relink_core::{
        BlobCodec, Cascade, JsonCodec, Key, LinkTableInfo, LinkWalker, ManyLink, Record, Ref,
        RelationshipInfo, RelationshipKind, SingleLink, Store, new_ref, relationships_of,
    };
}

fn outcome<T>(result: Result<T>) -> Outcome<T, Error> {
    match result {
        Ok(v) => Outcome::Ok(v),
        Err(e) => Outcome::Err(e),
    }
}

/// The relationship-aware database facade.
///
/// Wraps a [`Store`] and a [`BlobCodec`] and exposes the graph operations.
/// Each call runs under a fresh identity tracker, so identity and cycle
/// guarantees hold within one call (and across one batch), not across calls.
#[derive(Debug)]
pub struct Db<S: Store, C: BlobCodec = JsonCodec> {
    store: S,
    codec: C,
}

impl<S: Store> Db<S, JsonCodec> {
    /// Create a facade over a store with the default JSON blob codec.
    pub fn new(store: S) -> Self {
        Self {
            store,
            codec: JsonCodec,
        }
    }
}

impl<S: Store, C: BlobCodec> Db<S, C> {
    /// Create a facade with an explicit blob codec.
    pub fn with_codec(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch one record by key and hydrate its cascade-read relationships.
    pub fn get_with_children<T: Record>(
        &self,
        key: &Key,
        recursive: bool,
    ) -> Result<Option<Ref<T>>> {
        let mut tracker = IdentityTracker::new();
        GraphReader::new(&self.store, &self.codec, &mut tracker).get_with_children(key, recursive)
    }

    /// Populate the navigation fields of an existing record, one level deep,
    /// regardless of cascade-read flags.
    pub fn get_children<T: Record>(&self, root: &Ref<T>) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphReader::new(&self.store, &self.codec, &mut tracker).get_children(root)
    }

    /// Fetch every row of a table and hydrate each row's graph. Records
    /// shared between roots materialize once.
    pub fn get_all_with_children<T: Record>(&self, recursive: bool) -> Result<Vec<Ref<T>>> {
        let mut tracker = IdentityTracker::new();
        GraphReader::new(&self.store, &self.codec, &mut tracker).get_all_with_children(recursive)
    }

    /// Fetch every row whose `column` equals `value` and hydrate each row's
    /// graph.
    pub fn get_all_with_children_where<T: Record>(
        &self,
        column: &str,
        value: &Key,
        recursive: bool,
    ) -> Result<Vec<Ref<T>>> {
        let mut tracker = IdentityTracker::new();
        GraphReader::new(&self.store, &self.codec, &mut tracker)
            .get_all_with_children_where(column, value, recursive)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert a record and, with `recursive`, its cascade-insert graph.
    pub fn insert_with_children<T: Record>(&self, root: &Ref<T>, recursive: bool) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker)
            .insert_with_children(root, recursive)
    }

    /// Insert-or-replace a record and cascade over its graph, reconciling
    /// link tables to the in-memory association lists.
    pub fn insert_or_replace_with_children<T: Record>(
        &self,
        root: &Ref<T>,
        recursive: bool,
    ) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker)
            .insert_or_replace_with_children(root, recursive)
    }

    /// Update a record and, with `recursive`, its cascade-update graph.
    pub fn update_with_children<T: Record>(&self, root: &Ref<T>, recursive: bool) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker)
            .update_with_children(root, recursive)
    }

    /// Insert a batch of roots under one shared visited set.
    pub fn insert_all_with_children<T: Record>(
        &self,
        roots: &[Ref<T>],
        recursive: bool,
    ) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker)
            .insert_all_with_children(roots, recursive)
    }

    /// Delete a record and, with `recursive`, its cascade-delete graph.
    pub fn delete_with_children<T: Record>(&self, root: &Ref<T>, recursive: bool) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker)
            .delete_with_children(root, recursive)
    }

    /// Delete a batch of roots under one shared visited set.
    pub fn delete_all<T: Record>(&self, roots: &[Ref<T>], recursive: bool) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker).delete_all(roots, recursive)
    }

    /// Delete rows by key without materializing or cascading. Link rows
    /// referencing each key are removed.
    pub fn delete_all_ids<T: Record>(&self, keys: &[Key]) -> Result<()> {
        let mut tracker = IdentityTracker::new();
        GraphWriter::new(&self.store, &self.codec, &mut tracker).delete_all_ids::<T>(keys)
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// Create the record's table (and its link tables) if absent.
    pub fn create_table<T: Record>(&self) -> Result<()> {
        resolve::<T>()?;
        self.store.create_table::<T>()
    }

    /// Drop the record's table if present.
    pub fn drop_table<T: Record>(&self) -> Result<()> {
        self.store.drop_table::<T>()
    }

    /// Check whether the record's table exists.
    pub fn table_exists<T: Record>(&self) -> Result<bool> {
        self.store.table_exists::<T>()
    }

    // ------------------------------------------------------------------
    // Async variants
    // ------------------------------------------------------------------

    /// Cancel-aware variant of [`Db::get_with_children`].
    pub async fn get_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        key: &Key,
        recursive: bool,
    ) -> Outcome<Option<Ref<T>>, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.get_with_children::<T>(key, recursive))
    }

    /// Cancel-aware variant of [`Db::get_children`].
    pub async fn get_children_async<T: Record>(
        &self,
        cx: &Cx,
        root: &Ref<T>,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.get_children(root))
    }

    /// Cancel-aware variant of [`Db::get_all_with_children`].
    pub async fn get_all_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        recursive: bool,
    ) -> Outcome<Vec<Ref<T>>, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.get_all_with_children::<T>(recursive))
    }

    /// Cancel-aware variant of [`Db::insert_with_children`].
    pub async fn insert_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        root: &Ref<T>,
        recursive: bool,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.insert_with_children(root, recursive))
    }

    /// Cancel-aware variant of [`Db::insert_or_replace_with_children`].
    pub async fn insert_or_replace_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        root: &Ref<T>,
        recursive: bool,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.insert_or_replace_with_children(root, recursive))
    }

    /// Cancel-aware variant of [`Db::update_with_children`].
    pub async fn update_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        root: &Ref<T>,
        recursive: bool,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.update_with_children(root, recursive))
    }

    /// Cancel-aware variant of [`Db::insert_all_with_children`].
    pub async fn insert_all_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        roots: &[Ref<T>],
        recursive: bool,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.insert_all_with_children(roots, recursive))
    }

    /// Cancel-aware variant of [`Db::delete_with_children`].
    pub async fn delete_with_children_async<T: Record>(
        &self,
        cx: &Cx,
        root: &Ref<T>,
        recursive: bool,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.delete_with_children(root, recursive))
    }

    /// Cancel-aware variant of [`Db::delete_all`].
    pub async fn delete_all_async<T: Record>(
        &self,
        cx: &Cx,
        roots: &[Ref<T>],
        recursive: bool,
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.delete_all(roots, recursive))
    }

    /// Cancel-aware variant of [`Db::delete_all_ids`].
    pub async fn delete_all_ids_async<T: Record>(
        &self,
        cx: &Cx,
        keys: &[Key],
    ) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        outcome(self.delete_all_ids::<T>(keys))
    }
}
