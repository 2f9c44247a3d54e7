//! Graph write cascades: persisting records together with their related
//! records.
//!
//! Every write walks the graph in two passes around the row write. The
//! first pass settles foreign keys the owner's row carries (writing the FK
//! targets first so their keys exist); the second pass pushes the owner's
//! key into dependent records and reconciles link tables. The visited set
//! keys on handle identity, so shared records are written once and cyclic
//! graphs terminate.
//!
//! Cycles involving auto-assigned keys cannot be fully resolved in one
//! sweep: a record can need the key of an ancestor that is still being
//! written. Such foreign keys are recorded as fixups and applied after the
//! sweep, when every row exists and every key is assigned.

use crate::backref::SetBackref;
use crate::links;
use crate::tracker::IdentityTracker;
use relink_core::{
    BlobCodec, Cascade, Error, Key, LinkWalker, ManyLink, Record, Ref, RelationshipKind, Result,
    SingleLink, Store, resolve,
};
use std::sync::{Arc, TryLockError};

/// Which row operation a cascade performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOp {
    Insert,
    Upsert,
    Update,
}

const fn cascade_allows(cascade: Cascade, op: WriteOp) -> bool {
    match op {
        WriteOp::Insert | WriteOp::Upsert => cascade.insert,
        WriteOp::Update => cascade.update,
    }
}

/// Read a handle's key without blocking.
///
/// `None` means the handle is write-locked further up this same cascade
/// (an ancestor currently being walked); its key must be taken later, via a
/// fixup.
fn try_key<T: Record>(handle: &Ref<T>) -> Option<Key> {
    match handle.try_read() {
        Ok(guard) => Some(guard.key()),
        Err(TryLockError::WouldBlock) => None,
        Err(TryLockError::Poisoned(_)) => panic!("lock poisoned"),
    }
}

type Fixup<S, C> = Box<dyn FnOnce(&S, &C) -> Result<()>>;

/// Persists object graphs into flat row storage.
pub struct GraphWriter<'a, S: Store, C: BlobCodec> {
    store: &'a S,
    codec: &'a C,
    tracker: &'a mut IdentityTracker,
    fixups: Vec<Fixup<S, C>>,
}

impl<'a, S: Store, C: BlobCodec> GraphWriter<'a, S, C> {
    pub fn new(store: &'a S, codec: &'a C, tracker: &'a mut IdentityTracker) -> Self {
        Self {
            store,
            codec,
            tracker,
            fixups: Vec::new(),
        }
    }

    /// Insert a record and, with `recursive`, every cascade-insert related
    /// record reachable from it.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE))]
    pub fn insert_with_children<T: Record>(&mut self, root: &Ref<T>, recursive: bool) -> Result<()> {
        self.write_record(root, WriteOp::Insert, recursive, true)?;
        self.flush_fixups()
    }

    /// Insert-or-replace a record and cascade over its graph.
    ///
    /// Related link tables are reconciled to the in-memory association
    /// lists, so replacing also prunes stale links.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE))]
    pub fn insert_or_replace_with_children<T: Record>(
        &mut self,
        root: &Ref<T>,
        recursive: bool,
    ) -> Result<()> {
        self.write_record(root, WriteOp::Upsert, recursive, true)?;
        self.flush_fixups()
    }

    /// Update a record and, with `recursive`, every cascade-update related
    /// record reachable from it. A root without a key is inserted instead.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE))]
    pub fn update_with_children<T: Record>(&mut self, root: &Ref<T>, recursive: bool) -> Result<()> {
        self.write_record(root, WriteOp::Update, recursive, true)?;
        self.flush_fixups()
    }

    /// Insert a batch of roots under one shared visited set, so a record
    /// reachable from two roots is written once.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE, roots = roots.len()))]
    pub fn insert_all_with_children<T: Record>(
        &mut self,
        roots: &[Ref<T>],
        recursive: bool,
    ) -> Result<()> {
        for root in roots {
            self.write_record(root, WriteOp::Insert, recursive, true)?;
        }
        self.flush_fixups()
    }

    /// Delete a record's row and, with `recursive`, cascade-delete related
    /// rows.
    ///
    /// Rows holding a foreign key to the root go first, then the root, then
    /// foreign-key targets of the root. Link rows referencing the root are
    /// removed even when the far records are not cascade-deleted.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE))]
    pub fn delete_with_children<T: Record>(&mut self, root: &Ref<T>, recursive: bool) -> Result<()> {
        self.delete_record(root, recursive)
    }

    /// Delete a batch of roots under one shared visited set.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE, roots = roots.len()))]
    pub fn delete_all<T: Record>(&mut self, roots: &[Ref<T>], recursive: bool) -> Result<()> {
        for root in roots {
            self.delete_record(root, recursive)?;
        }
        Ok(())
    }

    /// Delete rows by key, without materializing them and without cascading.
    /// Link rows referencing each key are removed.
    #[tracing::instrument(level = "debug", skip(self), fields(table = T::TABLE, keys = keys.len()))]
    pub fn delete_all_ids<T: Record>(&mut self, keys: &[Key]) -> Result<()> {
        resolve::<T>()?;
        for key in keys {
            if key.is_none() {
                continue;
            }
            for rel in T::RELATIONSHIPS {
                if let Some(link_table) = rel.link_table {
                    self.store.clear_links_for(&link_table, key)?;
                }
            }
            self.store.delete_by_key::<T>(key)?;
        }
        Ok(())
    }

    /// Write one record and cascade over its relationships.
    ///
    /// Returns `false` when the handle was already written in this
    /// operation.
    fn write_record<T: Record>(
        &mut self,
        handle: &Ref<T>,
        op: WriteOp,
        recursive: bool,
        is_root: bool,
    ) -> Result<bool> {
        resolve::<T>()?;
        // Visited is checked before any lock is taken; a revisit in a cycle
        // must bail out while an ancestor frame still holds the lock.
        if !self.tracker.mark_visited(handle) {
            return Ok(false);
        }

        {
            let owner = Arc::clone(handle);
            let mut guard = handle.write().expect("lock poisoned");
            let mut pass = FkPass {
                writer: self,
                owner,
                op,
                recursive,
            };
            guard.walk(&mut pass)?;
        }

        let key = self.write_row(handle, op)?;

        {
            let owner = Arc::clone(handle);
            let mut guard = handle.write().expect("lock poisoned");
            let mut pass = InversePass {
                writer: self,
                owner,
                owner_key: key,
                op,
                recursive,
                is_root,
            };
            guard.walk(&mut pass)?;
        }
        Ok(true)
    }

    /// Perform the row write itself and adopt the stored key.
    fn write_row<T: Record>(&mut self, handle: &Ref<T>, op: WriteOp) -> Result<Key> {
        let mut guard = handle.write().expect("lock poisoned");
        guard.encode_blobs(self.codec)?;
        let stored = match op {
            WriteOp::Insert => self.store.insert(&*guard)?,
            WriteOp::Upsert => {
                if guard.key().is_none() {
                    self.store.insert(&*guard)?
                } else {
                    self.store.insert_or_replace(&*guard)?
                }
            }
            WriteOp::Update => {
                if guard.key().is_none() {
                    self.store.insert(&*guard)?
                } else {
                    self.store.update(&*guard)?;
                    guard.key()
                }
            }
        };
        if guard.key() != stored {
            guard.set_key(stored.clone());
        }
        drop(guard);
        self.tracker.adopt(stored.clone(), handle);
        tracing::debug!(table = T::TABLE, key = %stored, "row written");
        Ok(stored)
    }

    /// Delete one record's row and cascade over its relationships.
    fn delete_record<T: Record>(&mut self, handle: &Ref<T>, recursive: bool) -> Result<()> {
        resolve::<T>()?;
        let key = handle.read().expect("lock poisoned").key();
        if key.is_none() {
            return Ok(());
        }
        // Deletion dedupe is keyed on (type, key): cascades re-materialize
        // rows from storage, so handle identity cannot catch a cycle here.
        if self.tracker.contains::<T>(&key) {
            return Ok(());
        }
        self.tracker.adopt(key.clone(), handle);

        {
            let mut guard = handle.write().expect("lock poisoned");
            let mut pass = DeleteDependentsPass {
                writer: self,
                owner_key: key.clone(),
                recursive,
            };
            guard.walk(&mut pass)?;
        }

        self.store.delete_by_key::<T>(&key)?;
        tracing::debug!(table = T::TABLE, key = %key, "row deleted");

        {
            let mut guard = handle.write().expect("lock poisoned");
            let mut pass = DeleteTargetsPass {
                writer: self,
                recursive,
            };
            guard.walk(&mut pass)?;
        }
        Ok(())
    }

    /// Apply deferred foreign-key assignments, once every row in the sweep
    /// exists and every auto key is assigned.
    fn flush_fixups(&mut self) -> Result<()> {
        let fixups = std::mem::take(&mut self.fixups);
        if !fixups.is_empty() {
            tracing::debug!(count = fixups.len(), "applying deferred key fixups");
        }
        for fixup in fixups {
            fixup(self.store, self.codec)?;
        }
        Ok(())
    }
}

/// First write pass: settle the foreign keys stored on the owner's row.
struct FkPass<'w, 'a, S: Store, C: BlobCodec, O: Record> {
    writer: &'w mut GraphWriter<'a, S, C>,
    owner: Ref<O>,
    op: WriteOp,
    recursive: bool,
}

impl<S: Store, C: BlobCodec, O: Record> LinkWalker for FkPass<'_, '_, S, C, O> {
    type Error = Error;

    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> Result<()> {
        let info = link.info;
        if info.read_only {
            return Ok(());
        }
        // Relationships whose FK lives on the related record are handled
        // after the owner's row exists.
        let Some(fk) = link.fk else {
            return Ok(());
        };
        let Some(column) = info.local_key else {
            return Ok(());
        };

        let Some(child) = link.nav.as_ref() else {
            // Cleared navigation clears the stored key.
            *fk = Key::None;
            return Ok(());
        };

        if self.recursive && cascade_allows(info.cascade, self.op) {
            self.writer.write_record(child, self.op, true, false)?;
        }

        match try_key(child) {
            Some(key) => *fk = key,
            None => {
                // The target is an ancestor still being written. Its key may
                // not exist yet; leave whatever the ancestor's own pass put
                // in the column and patch the row afterwards if it is empty.
                if fk.is_none() {
                    let owner = Arc::clone(&self.owner);
                    let target = Arc::clone(child);
                    self.writer.fixups.push(Box::new(move |store, codec| {
                        let key = target.read().expect("lock poisoned").key();
                        let mut guard = owner.write().expect("lock poisoned");
                        guard.set_foreign_key(column, key);
                        guard.encode_blobs(codec)?;
                        store.update(&*guard)
                    }));
                }
            }
        }
        Ok(())
    }

    fn many<T: Record>(&mut self, _link: ManyLink<'_, T>) -> Result<()> {
        // To-many relationships never store a key on the owner's row.
        Ok(())
    }
}

/// Second write pass: push the owner's key into dependent records and
/// reconcile link tables.
struct InversePass<'w, 'a, S: Store, C: BlobCodec, O: Record> {
    writer: &'w mut GraphWriter<'a, S, C>,
    owner: Ref<O>,
    owner_key: Key,
    op: WriteOp,
    recursive: bool,
    is_root: bool,
}

impl<S: Store, C: BlobCodec, O: Record> InversePass<'_, '_, S, C, O> {
    /// Sync a dependent record's FK column, and its inverse navigation field
    /// when one is declared, deferring to a fixup when the record is locked
    /// further up the cascade.
    ///
    /// Wiring the inverse navigation matters for more than symmetry: the
    /// dependent's own FK pass treats an empty navigation field as a cleared
    /// relationship and would reset the key we just assigned.
    fn sync_child_fk<T: Record>(
        &mut self,
        child: &Ref<T>,
        column: &'static str,
        back_populates: Option<&'static str>,
    ) -> Result<()> {
        match child.try_write() {
            Ok(mut guard) => {
                guard.set_foreign_key(column, self.owner_key.clone());
                if let Some(field) = back_populates {
                    let mut backref = SetBackref {
                        field,
                        owner: &self.owner,
                        owner_key: &self.owner_key,
                    };
                    guard.walk(&mut backref)?;
                }
            }
            Err(TryLockError::WouldBlock) => {
                let child = Arc::clone(child);
                let owner_key = self.owner_key.clone();
                self.writer.fixups.push(Box::new(move |store, codec| {
                    let mut guard = child.write().expect("lock poisoned");
                    guard.set_foreign_key(column, owner_key);
                    if guard.key().is_some() {
                        guard.encode_blobs(codec)?;
                        store.update(&*guard)?;
                    }
                    Ok(())
                }));
            }
            Err(TryLockError::Poisoned(_)) => panic!("lock poisoned"),
        }
        Ok(())
    }

    /// Persist a dependent record, or just its FK column when the cascade
    /// does not extend to it.
    fn persist_child<T: Record>(&mut self, child: &Ref<T>, column: &'static str, cascade: Cascade) -> Result<()> {
        let wrote = if self.recursive && cascade_allows(cascade, self.op) {
            self.writer.write_record(child, self.op, true, false)?
        } else {
            false
        };
        if !wrote {
            // Already written this sweep, or out of cascade scope: patch the
            // stored FK column of an existing row directly.
            if let Some(key) = try_key(child) {
                if key.is_some() {
                    self.writer
                        .store
                        .set_column::<T>(&key, column, &self.owner_key)?;
                }
            }
        }
        Ok(())
    }
}

impl<S: Store, C: BlobCodec, O: Record> LinkWalker for InversePass<'_, '_, S, C, O> {
    type Error = Error;

    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> Result<()> {
        let info = link.info;
        if info.read_only || link.fk.is_some() {
            return Ok(());
        }
        let Some(column) = info.remote_key else {
            return Ok(());
        };
        // Clearing the navigation field does not touch rows we never saw;
        // only a present child is synced.
        if let Some(child) = link.nav.as_ref() {
            let child = Arc::clone(child);
            self.sync_child_fk(&child, column, info.back_populates)?;
            self.persist_child(&child, column, info.cascade)?;
        }
        Ok(())
    }

    fn many<T: Record>(&mut self, link: ManyLink<'_, T>) -> Result<()> {
        let info = link.info;
        if info.read_only {
            return Ok(());
        }
        match info.kind {
            RelationshipKind::OneToMany => {
                let Some(column) = info.remote_key else {
                    return Ok(());
                };
                for child in link.nav.iter() {
                    self.sync_child_fk(child, column, info.back_populates)?;
                    self.persist_child(child, column, info.cascade)?;
                }
            }
            RelationshipKind::ManyToMany => {
                let Some(link_table) = info.link_table else {
                    return Ok(());
                };
                let mut desired = Vec::with_capacity(link.nav.len());
                for far in link.nav.iter() {
                    if self.recursive && cascade_allows(info.cascade, self.op) {
                        self.writer.write_record(far, self.op, true, false)?;
                    }
                    match try_key(far) {
                        Some(key) => desired.push(key),
                        None => {
                            // Ancestor mid-write: its link row is added once
                            // its key exists.
                            let far = Arc::clone(far);
                            let owner_key = self.owner_key.clone();
                            self.writer.fixups.push(Box::new(move |store, _codec| {
                                let key = far.read().expect("lock poisoned").key();
                                if key.is_some() {
                                    store.insert_link(&link_table, &owner_key, &key)?;
                                }
                                Ok(())
                            }));
                        }
                    }
                }
                if self.is_root {
                    links::reconcile(self.writer.store, &link_table, &self.owner_key, &desired)?;
                } else {
                    // A record reached through a cascade may not have its
                    // association list loaded; pruning from it would destroy
                    // links it never saw. Only the operation root deletes.
                    for far_key in &desired {
                        if far_key.is_some() {
                            self.writer
                                .store
                                .insert_link(&link_table, &self.owner_key, far_key)?;
                        }
                    }
                }
            }
            RelationshipKind::OneToOne | RelationshipKind::ManyToOne => {}
        }
        Ok(())
    }
}

/// First delete pass: remove rows that hold a foreign key to the owner,
/// and the owner's link rows.
struct DeleteDependentsPass<'w, 'a, S: Store, C: BlobCodec> {
    writer: &'w mut GraphWriter<'a, S, C>,
    owner_key: Key,
    recursive: bool,
}

impl<S: Store, C: BlobCodec> DeleteDependentsPass<'_, '_, S, C> {
    fn delete_dependents<T: Record>(&mut self, column: &'static str) -> Result<()> {
        let rows = self
            .writer
            .store
            .find_where::<T>(column, &self.owner_key)?;
        for row in rows {
            self.writer.delete_record(&relink_core::new_ref(row), true)?;
        }
        Ok(())
    }
}

impl<S: Store, C: BlobCodec> LinkWalker for DeleteDependentsPass<'_, '_, S, C> {
    type Error = Error;

    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> Result<()> {
        let info = link.info;
        if info.read_only || link.fk.is_some() {
            return Ok(());
        }
        let Some(column) = info.remote_key else {
            return Ok(());
        };
        if self.recursive && info.cascade.delete {
            self.delete_dependents::<T>(column)?;
        }
        Ok(())
    }

    fn many<T: Record>(&mut self, link: ManyLink<'_, T>) -> Result<()> {
        let info = link.info;
        if info.read_only {
            return Ok(());
        }
        match info.kind {
            RelationshipKind::OneToMany => {
                let Some(column) = info.remote_key else {
                    return Ok(());
                };
                if self.recursive && info.cascade.delete {
                    self.delete_dependents::<T>(column)?;
                }
            }
            RelationshipKind::ManyToMany => {
                let Some(link_table) = info.link_table else {
                    return Ok(());
                };
                let far_keys = if self.recursive && info.cascade.delete {
                    self.writer.store.link_rows(&link_table, &self.owner_key)?
                } else {
                    Vec::new()
                };
                // Link rows always go, even when the far records stay.
                links::clear_links(self.writer.store, &link_table, &self.owner_key)?;
                for far_key in far_keys {
                    if let Some(row) = self.writer.store.find::<T>(&far_key)? {
                        self.writer.delete_record(&relink_core::new_ref(row), true)?;
                    }
                }
            }
            RelationshipKind::OneToOne | RelationshipKind::ManyToOne => {}
        }
        Ok(())
    }
}

/// Second delete pass: remove foreign-key targets of the owner, after the
/// owner's row (and its FK reference) is gone.
struct DeleteTargetsPass<'w, 'a, S: Store, C: BlobCodec> {
    writer: &'w mut GraphWriter<'a, S, C>,
    recursive: bool,
}

impl<S: Store, C: BlobCodec> LinkWalker for DeleteTargetsPass<'_, '_, S, C> {
    type Error = Error;

    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> Result<()> {
        let info = link.info;
        if info.read_only {
            return Ok(());
        }
        let Some(fk) = link.fk else {
            return Ok(());
        };
        if !(self.recursive && info.cascade.delete) || fk.is_none() {
            return Ok(());
        }
        if let Some(row) = self.writer.store.find::<T>(fk)? {
            self.writer.delete_record(&relink_core::new_ref(row), true)?;
        }
        Ok(())
    }

    fn many<T: Record>(&mut self, _link: ManyLink<'_, T>) -> Result<()> {
        Ok(())
    }
}
