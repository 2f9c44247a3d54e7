//! Error types for relink operations.

use std::fmt;

/// The primary error type for all relink operations.
#[derive(Debug)]
pub enum Error {
    /// Relationship metadata misconfiguration. Fatal, raised at resolve time,
    /// never retried.
    Config(ConfigError),
    /// Storage collaborator failure, propagated unchanged.
    Storage(StorageError),
    /// Row/blob serialization failure.
    Serde(String),
    /// Custom error with message.
    Custom(String),
}

/// A fatal relationship-metadata error.
///
/// A missing root row or an absent relationship target is *not* an error
/// (those surface as `None`/empty results); this type is reserved for
/// declarations the engine cannot act on at all.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Table of the record type whose metadata is broken.
    pub table: &'static str,
    /// The offending relationship field, if the problem is per-relationship.
    pub relationship: Option<&'static str>,
    /// Human-readable description.
    pub message: String,
}

#[derive(Debug)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub table: String,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Constraint violation (duplicate key, etc.).
    Constraint,
    /// Table does not exist where the operation requires it.
    MissingTable,
    /// Other backend error.
    Backend,
}

impl Error {
    /// Build a configuration error for a record type.
    pub fn config(table: &'static str, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            table,
            relationship: None,
            message: message.into(),
        })
    }

    /// Build a configuration error scoped to a relationship field.
    pub fn relationship(
        table: &'static str,
        relationship: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::Config(ConfigError {
            table,
            relationship: Some(relationship),
            message: message.into(),
        })
    }

    /// Build a storage error without an underlying source.
    pub fn storage(
        kind: StorageErrorKind,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Storage(StorageError {
            kind,
            table: table.into(),
            message: message.into(),
            source: None,
        })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {e}"),
            Error::Storage(e) => write!(f, "storage error: {e}"),
            Error::Serde(msg) => write!(f, "serialization error: {msg}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.relationship {
            Some(rel) => write!(f, "{}.{}: {}", self.table, rel, self.message),
            None => write!(f, "{}: {}", self.table, self.message),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            StorageErrorKind::Constraint => "constraint violation",
            StorageErrorKind::MissingTable => "missing table",
            StorageErrorKind::Backend => "backend failure",
        };
        write!(f, "{kind} on {}: {}", self.table, self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(e) => e
                .source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e.to_string())
    }
}

/// Convenience result type for relink operations.
pub type Result<T> = std::result::Result<T, Error>;
