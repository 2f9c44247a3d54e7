//! Relationship metadata and the metadata resolver.
//!
//! Relationships are declared as static metadata on each [`Record`] type
//! (normally emitted by a code-generation step, or written out by hand as an
//! explicit registration). The resolver validates a type's declarations once
//! per process and memoizes the verdict, so a misconfigured relationship
//! fails fast at the first read or write touching the type, never lazily in
//! the middle of a cascade.

use crate::error::{Error, Result};
use crate::record::Record;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, RwLock};

/// The kind of relationship between two record types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: a `Customer` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Order`s belong to one `Customer`.
    #[default]
    ManyToOne,
    /// One-to-many: one `Customer` has many `Order`s.
    OneToMany,
    /// Many-to-many: `Student`s attend many `Course`s via a link table.
    ManyToMany,
}

/// The cascade operations a relationship participates in.
///
/// Each flag controls whether the relationship is followed during the
/// corresponding graph operation. A relationship with no flags set is still
/// kept foreign-key-consistent on writes; it is just never traversed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cascade {
    pub insert: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl Cascade {
    /// No cascade operations.
    pub const NONE: Self = Self {
        insert: false,
        read: false,
        update: false,
        delete: false,
    };

    /// All four cascade operations.
    pub const ALL: Self = Self {
        insert: true,
        read: true,
        update: true,
        delete: true,
    };

    /// Read-only cascading (hydration follows the relationship, writes do not).
    pub const READ: Self = Self {
        insert: false,
        read: true,
        update: false,
        delete: false,
    };

    /// Insert + read + update, without cascade delete.
    pub const WRITE: Self = Self {
        insert: true,
        read: true,
        update: true,
        delete: false,
    };

    #[must_use]
    pub const fn with_insert(mut self) -> Self {
        self.insert = true;
        self
    }

    #[must_use]
    pub const fn with_read(mut self) -> Self {
        self.read = true;
        self
    }

    #[must_use]
    pub const fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    #[must_use]
    pub const fn with_delete(mut self) -> Self {
        self.delete = true;
        self
    }
}

/// Information about a link/join table for many-to-many relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTableInfo {
    /// The link table name (e.g., `"student_courses"`).
    pub table_name: &'static str,

    /// Column in the link table pointing at the declaring ("near") side.
    pub local_column: &'static str,

    /// Column in the link table pointing at the related ("far") side.
    pub remote_column: &'static str,
}

impl LinkTableInfo {
    /// Create a new link-table definition.
    #[must_use]
    pub const fn new(
        table_name: &'static str,
        local_column: &'static str,
        remote_column: &'static str,
    ) -> Self {
        Self {
            table_name,
            local_column,
            remote_column,
        }
    }
}

fn empty_relationships() -> &'static [RelationshipInfo] {
    &[]
}

/// Return a record type's relationship declarations.
///
/// Usable as a `related_relationships` function pointer in const contexts.
pub fn relationships_of<T: Record>() -> &'static [RelationshipInfo] {
    T::RELATIONSHIPS
}

/// Metadata about one relationship between record types.
///
/// Exactly one foreign-key location is declared per non-many-to-many
/// relationship: `local_key` when the FK column lives on the declaring
/// record, `remote_key` when it lives on the related record. Many-to-many
/// relationships carry no scalar FK and declare a [`LinkTableInfo`] instead.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipInfo {
    /// Name of the navigation field.
    pub name: &'static str,

    /// The related record's table name.
    pub related_table: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Foreign-key column on the declaring record (ManyToOne, FK-side OneToOne).
    pub local_key: Option<&'static str>,

    /// Foreign-key column on the related record (OneToMany, inverse OneToOne).
    pub remote_key: Option<&'static str>,

    /// Link table for ManyToMany relationships.
    pub link_table: Option<LinkTableInfo>,

    /// The navigation field on the related record that points back.
    pub back_populates: Option<&'static str>,

    /// Cascade operations this relationship participates in.
    pub cascade: Cascade,

    /// Read-only relationships are populated by the reader but never produce
    /// writes of their own; the inverse side owns persistence.
    pub read_only: bool,

    /// Function pointer returning the related type's relationship metadata.
    ///
    /// Keeps the metadata zero-cost (static, no allocation) while letting the
    /// resolver validate `back_populates` symmetry without runtime reflection.
    pub related_relationships_fn: fn() -> &'static [RelationshipInfo],
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    #[must_use]
    pub const fn new(
        name: &'static str,
        related_table: &'static str,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            name,
            related_table,
            kind,
            local_key: None,
            remote_key: None,
            link_table: None,
            back_populates: None,
            cascade: Cascade::READ,
            read_only: false,
            related_relationships_fn: empty_relationships,
        }
    }

    /// Set the foreign-key column on the declaring record.
    #[must_use]
    pub const fn local_key(mut self, column: &'static str) -> Self {
        self.local_key = Some(column);
        self
    }

    /// Set the foreign-key column on the related record.
    #[must_use]
    pub const fn remote_key(mut self, column: &'static str) -> Self {
        self.remote_key = Some(column);
        self
    }

    /// Set the link table metadata (ManyToMany).
    #[must_use]
    pub const fn link_table(mut self, info: LinkTableInfo) -> Self {
        self.link_table = Some(info);
        self
    }

    /// Set the back-populates field name (bidirectional relationships).
    #[must_use]
    pub const fn back_populates(mut self, field: &'static str) -> Self {
        self.back_populates = Some(field);
        self
    }

    /// Set the cascade flags.
    #[must_use]
    pub const fn cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Mark the relationship read-only.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Provide the related type's relationship metadata function.
    #[must_use]
    pub const fn related(mut self, f: fn() -> &'static [RelationshipInfo]) -> Self {
        self.related_relationships_fn = f;
        self
    }

    /// Check whether the foreign key lives on the declaring record.
    #[must_use]
    pub const fn fk_on_owner(&self) -> bool {
        self.local_key.is_some()
    }
}

/// Find a relationship by navigation-field name on a record type.
#[must_use]
pub fn find_relationship<T: Record>(field_name: &str) -> Option<&'static RelationshipInfo> {
    T::RELATIONSHIPS.iter().find(|r| r.name == field_name)
}

// ============================================================================
// Metadata Resolver
// ============================================================================

fn validated_types() -> &'static RwLock<HashSet<TypeId>> {
    static CACHE: OnceLock<RwLock<HashSet<TypeId>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashSet::new()))
}

/// Resolve and validate a record type's relationship descriptors.
///
/// The first call for a type runs the full validation below; subsequent
/// calls hit a process-wide cache. A first-computation race validates the
/// same (immutable) metadata twice, which is wasteful but benign, so the
/// cache is a plain check-then-fill.
///
/// Validation rules:
/// - `ManyToOne` requires `local_key` and forbids `remote_key`/`link_table`.
/// - `OneToMany` requires `remote_key` and forbids `local_key`/`link_table`.
/// - `OneToOne` requires exactly one of `local_key`/`remote_key`.
/// - `ManyToMany` requires a `link_table` with both columns named, and
///   forbids scalar keys.
/// - Relationship names must be unique per type.
/// - `back_populates` must name a relationship that exists on the related
///   type and points back at this table.
pub fn resolve<T: Record>() -> Result<&'static [RelationshipInfo]> {
    let type_id = TypeId::of::<T>();
    if validated_types()
        .read()
        .expect("resolver cache poisoned")
        .contains(&type_id)
    {
        return Ok(T::RELATIONSHIPS);
    }

    validate::<T>()?;

    validated_types()
        .write()
        .expect("resolver cache poisoned")
        .insert(type_id);
    tracing::debug!(
        table = T::TABLE,
        relationships = T::RELATIONSHIPS.len(),
        "relationship metadata resolved"
    );
    Ok(T::RELATIONSHIPS)
}

fn validate<T: Record>() -> Result<()> {
    let mut seen: HashMap<&'static str, ()> = HashMap::new();

    for rel in T::RELATIONSHIPS {
        if seen.insert(rel.name, ()).is_some() {
            return Err(Error::relationship(
                T::TABLE,
                rel.name,
                "duplicate relationship name",
            ));
        }

        match rel.kind {
            RelationshipKind::ManyToOne => {
                if rel.local_key.is_none() {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "many-to-one requires a local foreign-key column",
                    ));
                }
                if rel.remote_key.is_some() || rel.link_table.is_some() {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "many-to-one takes only a local foreign-key column",
                    ));
                }
            }
            RelationshipKind::OneToMany => {
                if rel.remote_key.is_none() {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "one-to-many requires a foreign-key column on the related record",
                    ));
                }
                if rel.local_key.is_some() || rel.link_table.is_some() {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "one-to-many takes only a remote foreign-key column",
                    ));
                }
            }
            RelationshipKind::OneToOne => {
                let sides = usize::from(rel.local_key.is_some())
                    + usize::from(rel.remote_key.is_some());
                if sides != 1 {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "one-to-one requires exactly one foreign-key side",
                    ));
                }
                if rel.link_table.is_some() {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "one-to-one cannot use a link table",
                    ));
                }
            }
            RelationshipKind::ManyToMany => {
                let Some(link) = rel.link_table else {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "many-to-many requires a link table declaration",
                    ));
                };
                if link.table_name.is_empty()
                    || link.local_column.is_empty()
                    || link.remote_column.is_empty()
                {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "link table needs a table name and both key columns",
                    ));
                }
                if rel.local_key.is_some() || rel.remote_key.is_some() {
                    return Err(Error::relationship(
                        T::TABLE,
                        rel.name,
                        "many-to-many carries no scalar foreign key",
                    ));
                }
            }
        }

        if let Some(back) = rel.back_populates {
            let related = (rel.related_relationships_fn)();
            let Some(inverse) = related.iter().find(|r| r.name == back) else {
                return Err(Error::relationship(
                    T::TABLE,
                    rel.name,
                    format!(
                        "back_populates '{back}' does not exist on {}",
                        rel.related_table
                    ),
                ));
            };
            if inverse.related_table != T::TABLE {
                return Err(Error::relationship(
                    T::TABLE,
                    rel.name,
                    format!(
                        "back_populates '{back}' on {} relates to {}, not {}",
                        rel.related_table, inverse.related_table, T::TABLE
                    ),
                ));
            }
        }
    }

    Ok(())
}
