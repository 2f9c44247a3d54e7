//! In-memory storage backend.
//!
//! Rows are kept as JSON objects keyed by primary key, link tables as plain
//! row lists keyed by column name. The backend mirrors SQL-ish semantics
//! where they matter to the engine: reads against a missing table come back
//! empty, writes against a missing table fail, duplicate-key inserts are
//! constraint violations, and integer keys are auto-assigned for auto-key
//! record types.

use relink_core::{
    Error, Key, LinkTableInfo, Record, Result, Store, StorageErrorKind,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<Key, Value>,
    next_id: i64,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// A thread-safe in-memory [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
    links: RwLock<HashMap<&'static str, Vec<HashMap<&'static str, Key>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn missing_table(table: &str) -> Error {
        Error::storage(
            StorageErrorKind::MissingTable,
            table,
            "table has not been created",
        )
    }

    fn row_value<T: Record>(record: &T) -> Result<Value> {
        let value = serde_json::to_value(record)?;
        if value.is_object() {
            Ok(value)
        } else {
            Err(Error::storage(
                StorageErrorKind::Backend,
                T::TABLE,
                "record did not serialize to an object",
            ))
        }
    }

    fn decode_row<T: Record>(value: &Value) -> Result<T> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Store a row under `key`, assigning an integer key first when the
    /// record type is auto-keyed and the key is unset.
    fn put_row<T: Record>(&self, record: &T, replace: bool) -> Result<Key> {
        let mut value = Self::row_value(record)?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let table = tables
            .get_mut(T::TABLE)
            .ok_or_else(|| Self::missing_table(T::TABLE))?;

        let key = match record.key() {
            Key::None if T::AUTO_KEY => {
                let key = Key::Int(table.next_id);
                table.next_id += 1;
                value[T::PRIMARY_KEY] = serde_json::to_value(&key)?;
                key
            }
            Key::None => {
                return Err(Error::storage(
                    StorageErrorKind::Backend,
                    T::TABLE,
                    "row has no primary key and the table does not auto-assign one",
                ));
            }
            key => {
                if let Key::Int(n) = key {
                    table.next_id = table.next_id.max(n + 1);
                }
                key
            }
        };

        if !replace && table.rows.contains_key(&key) {
            return Err(Error::storage(
                StorageErrorKind::Constraint,
                T::TABLE,
                format!("duplicate primary key {key}"),
            ));
        }
        table.rows.insert(key.clone(), value);
        Ok(key)
    }
}

impl Store for MemoryStore {
    fn insert<T: Record>(&self, record: &T) -> Result<Key> {
        self.put_row(record, false)
    }

    fn insert_or_replace<T: Record>(&self, record: &T) -> Result<Key> {
        self.put_row(record, true)
    }

    fn update<T: Record>(&self, record: &T) -> Result<()> {
        let value = Self::row_value(record)?;
        let key = record.key();
        let mut tables = self.tables.write().expect("lock poisoned");
        let table = tables
            .get_mut(T::TABLE)
            .ok_or_else(|| Self::missing_table(T::TABLE))?;
        // Updating an absent row affects nothing, as in SQL.
        if let Some(row) = table.rows.get_mut(&key) {
            *row = value;
        }
        Ok(())
    }

    fn set_column<T: Record>(&self, key: &Key, column: &'static str, value: &Key) -> Result<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let table = tables
            .get_mut(T::TABLE)
            .ok_or_else(|| Self::missing_table(T::TABLE))?;
        if let Some(row) = table.rows.get_mut(key) {
            row[column] = serde_json::to_value(value)?;
        }
        Ok(())
    }

    fn delete_by_key<T: Record>(&self, key: &Key) -> Result<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let table = tables
            .get_mut(T::TABLE)
            .ok_or_else(|| Self::missing_table(T::TABLE))?;
        table.rows.remove(key);
        Ok(())
    }

    fn find<T: Record>(&self, key: &Key) -> Result<Option<T>> {
        let tables = self.tables.read().expect("lock poisoned");
        let Some(table) = tables.get(T::TABLE) else {
            return Ok(None);
        };
        table.rows.get(key).map(Self::decode_row).transpose()
    }

    fn find_where<T: Record>(&self, column: &str, value: &Key) -> Result<Vec<T>> {
        let wanted = serde_json::to_value(value)?;
        let tables = self.tables.read().expect("lock poisoned");
        let Some(table) = tables.get(T::TABLE) else {
            return Ok(Vec::new());
        };
        table
            .rows
            .values()
            .filter(|row| row.get(column) == Some(&wanted))
            .map(Self::decode_row)
            .collect()
    }

    fn all<T: Record>(&self) -> Result<Vec<T>> {
        let tables = self.tables.read().expect("lock poisoned");
        let Some(table) = tables.get(T::TABLE) else {
            return Ok(Vec::new());
        };
        table.rows.values().map(Self::decode_row).collect()
    }

    fn table_exists<T: Record>(&self) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .expect("lock poisoned")
            .contains_key(T::TABLE))
    }

    fn create_table<T: Record>(&self) -> Result<()> {
        self.tables
            .write()
            .expect("lock poisoned")
            .entry(T::TABLE)
            .or_insert_with(Table::new);
        // Link tables for the type's many-to-many relationships come along.
        let mut links = self.links.write().expect("lock poisoned");
        for rel in T::RELATIONSHIPS {
            if let Some(link) = rel.link_table {
                links.entry(link.table_name).or_default();
            }
        }
        tracing::debug!(table = T::TABLE, "table created");
        Ok(())
    }

    fn drop_table<T: Record>(&self) -> Result<()> {
        self.tables.write().expect("lock poisoned").remove(T::TABLE);
        let mut links = self.links.write().expect("lock poisoned");
        for rel in T::RELATIONSHIPS {
            if let Some(link) = rel.link_table {
                links.remove(link.table_name);
            }
        }
        Ok(())
    }

    fn link_rows(&self, link: &LinkTableInfo, near: &Key) -> Result<Vec<Key>> {
        let links = self.links.read().expect("lock poisoned");
        let Some(rows) = links.get(link.table_name) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|row| row.get(link.local_column) == Some(near))
            .filter_map(|row| row.get(link.remote_column).cloned())
            .collect())
    }

    fn insert_link(&self, link: &LinkTableInfo, near: &Key, far: &Key) -> Result<()> {
        let mut links = self.links.write().expect("lock poisoned");
        let rows = links
            .get_mut(link.table_name)
            .ok_or_else(|| Self::missing_table(link.table_name))?;
        let exists = rows.iter().any(|row| {
            row.get(link.local_column) == Some(near) && row.get(link.remote_column) == Some(far)
        });
        if !exists {
            let mut row = HashMap::new();
            row.insert(link.local_column, near.clone());
            row.insert(link.remote_column, far.clone());
            rows.push(row);
        }
        Ok(())
    }

    fn delete_link(&self, link: &LinkTableInfo, near: &Key, far: &Key) -> Result<()> {
        let mut links = self.links.write().expect("lock poisoned");
        if let Some(rows) = links.get_mut(link.table_name) {
            rows.retain(|row| {
                !(row.get(link.local_column) == Some(near)
                    && row.get(link.remote_column) == Some(far))
            });
        }
        Ok(())
    }

    fn clear_links_for(&self, link: &LinkTableInfo, near: &Key) -> Result<()> {
        let mut links = self.links.write().expect("lock poisoned");
        if let Some(rows) = links.get_mut(link.table_name) {
            rows.retain(|row| row.get(link.local_column) != Some(near));
        }
        Ok(())
    }
}
