//! The storage abstraction the cascade engine is built over.
//!
//! A [`Store`] provides flat, single-row persistence plus link-table row
//! management. It knows nothing about relationships, identity tracking, or
//! cascades; the engine composes those on top. Backends take `&self` and are
//! expected to synchronize internally.

use crate::error::Result;
use crate::key::Key;
use crate::record::Record;
use crate::relationship::LinkTableInfo;

/// Flat row storage plus link-table management.
pub trait Store: Send + Sync {
    /// Insert a record's row. Returns the stored primary key, which differs
    /// from `record.key()` when the backend assigned an auto key.
    fn insert<T: Record>(&self, record: &T) -> Result<Key>;

    /// Insert a record's row, replacing any existing row with the same key.
    fn insert_or_replace<T: Record>(&self, record: &T) -> Result<Key>;

    /// Update an existing record's row by primary key.
    fn update<T: Record>(&self, record: &T) -> Result<()>;

    /// Overwrite a single key-valued column on an existing row.
    ///
    /// Used to keep child foreign-key columns consistent without rewriting
    /// the whole child row.
    fn set_column<T: Record>(&self, key: &Key, column: &'static str, value: &Key) -> Result<()>;

    /// Delete a record's row.
    fn delete<T: Record>(&self, record: &T) -> Result<()> {
        self.delete_by_key::<T>(&record.key())
    }

    /// Delete a row by primary key. Deleting an absent row is not an error.
    fn delete_by_key<T: Record>(&self, key: &Key) -> Result<()>;

    /// Fetch one row by primary key.
    fn find<T: Record>(&self, key: &Key) -> Result<Option<T>>;

    /// Fetch all rows whose `column` equals `value`.
    fn find_where<T: Record>(&self, column: &str, value: &Key) -> Result<Vec<T>>;

    /// Fetch every row in the record's table.
    fn all<T: Record>(&self) -> Result<Vec<T>>;

    /// Check whether the record's table exists.
    fn table_exists<T: Record>(&self) -> Result<bool>;

    /// Create the record's table (and its link tables) if absent.
    fn create_table<T: Record>(&self) -> Result<()>;

    /// Drop the record's table if present.
    fn drop_table<T: Record>(&self) -> Result<()>;

    /// Fetch the far-side keys of every link row whose near column equals
    /// `near`, in insertion order.
    fn link_rows(&self, link: &LinkTableInfo, near: &Key) -> Result<Vec<Key>>;

    /// Insert one link row. Inserting a pair that is already present is a
    /// no-op.
    fn insert_link(&self, link: &LinkTableInfo, near: &Key, far: &Key) -> Result<()>;

    /// Delete one link row. Deleting an absent pair is not an error.
    fn delete_link(&self, link: &LinkTableInfo, near: &Key, far: &Key) -> Result<()>;

    /// Delete every link row whose near column equals `near`.
    fn clear_links_for(&self, link: &LinkTableInfo, near: &Key) -> Result<()>;
}
