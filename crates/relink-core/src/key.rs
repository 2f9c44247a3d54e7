//! Primary/foreign key values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically-typed primary (or foreign) key value.
///
/// Keys are drawn from a small closed set of scalar types and compared
/// structurally, which makes them usable as identity-map keys and as
/// link-table cell values alike.
///
/// `Key::None` is the zero/default value: a record whose key is `None` has
/// not been assigned an identity yet, and a foreign-key column holding
/// `None` points at nothing. Integer zero is a valid key; only `None`
/// means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Unassigned / null key.
    #[default]
    None,

    /// 64-bit signed integer key (also covers auto-generated row ids).
    Int(i64),

    /// UUID/GUID key (as 16 bytes).
    Uuid([u8; 16]),

    /// Text key.
    Text(String),
}

impl Key {
    /// Check if this key is unassigned.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Key::None)
    }

    /// Check if this key carries a value.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Get the type name of this key.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Key::None => "NONE",
            Key::Int(_) => "INTEGER",
            Key::Uuid(_) => "UUID",
            Key::Text(_) => "TEXT",
        }
    }

    /// Try to get this key as an i64.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Key::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this key as a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::None => write!(f, "<none>"),
            Key::Int(v) => write!(f, "{v}"),
            Key::Uuid(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Key::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(i64::from(v))
    }
}

impl From<[u8; 16]> for Key {
    fn from(v: [u8; 16]) -> Self {
        Key::Uuid(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Text(v)
    }
}

impl<K: Into<Key>> From<Option<K>> for Key {
    fn from(v: Option<K>) -> Self {
        v.map_or(Key::None, Into::into)
    }
}
