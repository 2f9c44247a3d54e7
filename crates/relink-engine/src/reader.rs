//! Graph hydration: materializing records together with their related
//! records.
//!
//! The reader walks relationship metadata outward from a root row, fetching
//! related rows through the [`Store`] and wiring navigation fields up as
//! shared handles. All materialization goes through the operation's
//! [`IdentityTracker`], so a row reached twice yields one handle and cyclic
//! graphs terminate: the second arrival is a tracker hit and is wired up
//! without descending again.

use crate::backref::SetBackref;
use crate::tracker::IdentityTracker;
use relink_core::{
    BlobCodec, Error, Key, LinkWalker, ManyLink, Record, Ref, RelationshipKind, Result,
    SingleLink, Store, resolve,
};
use std::sync::Arc;

/// Hydrates object graphs out of flat row storage.
pub struct GraphReader<'a, S: Store, C: BlobCodec> {
    store: &'a S,
    codec: &'a C,
    tracker: &'a mut IdentityTracker,
}

impl<'a, S: Store, C: BlobCodec> GraphReader<'a, S, C> {
    pub fn new(store: &'a S, codec: &'a C, tracker: &'a mut IdentityTracker) -> Self {
        Self {
            store,
            codec,
            tracker,
        }
    }

    /// Fetch one record by key and hydrate its relationship graph.
    ///
    /// Only relationships whose cascade declares `read` are followed. With
    /// `recursive` false, hydration stops one level below the root. An
    /// absent row is `Ok(None)`, as is a [`Key::None`] lookup.
    #[tracing::instrument(level = "debug", skip(self), fields(table = T::TABLE, key = %key))]
    pub fn get_with_children<T: Record>(
        &mut self,
        key: &Key,
        recursive: bool,
    ) -> Result<Option<Ref<T>>> {
        resolve::<T>()?;
        if key.is_none() {
            return Ok(None);
        }
        if let Some(existing) = self.tracker.get::<T>(key) {
            return Ok(Some(existing));
        }
        let Some(row) = self.store.find::<T>(key)? else {
            return Ok(None);
        };
        let (handle, _) = self.adopt_row(row)?;
        self.populate(&handle, recursive, true)?;
        Ok(Some(handle))
    }

    /// Populate the navigation fields of an already-materialized record, one
    /// level deep, regardless of cascade-read flags.
    ///
    /// To-many slots are cleared and refilled from storage; stale handles
    /// from a previous hydration are dropped.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE))]
    pub fn get_children<T: Record>(&mut self, root: &Ref<T>) -> Result<()> {
        resolve::<T>()?;
        let key = root.read().expect("lock poisoned").key();
        if key.is_some() && !self.tracker.contains::<T>(&key) {
            self.tracker.adopt(key, root);
        }
        self.populate(root, false, false)
    }

    /// Fetch every row of a table and hydrate each row's graph.
    ///
    /// All roots share this reader's tracker, so a record related to two
    /// roots materializes once and is shared between them.
    #[tracing::instrument(level = "debug", skip(self), fields(table = T::TABLE))]
    pub fn get_all_with_children<T: Record>(&mut self, recursive: bool) -> Result<Vec<Ref<T>>> {
        resolve::<T>()?;
        let rows = self.store.all::<T>()?;
        self.hydrate_rows(rows, recursive)
    }

    /// Fetch every row whose `column` equals `value` and hydrate each row's
    /// graph.
    #[tracing::instrument(
        level = "debug",
        skip(self),
        fields(table = T::TABLE, column, value = %value)
    )]
    pub fn get_all_with_children_where<T: Record>(
        &mut self,
        column: &str,
        value: &Key,
        recursive: bool,
    ) -> Result<Vec<Ref<T>>> {
        resolve::<T>()?;
        let rows = self.store.find_where::<T>(column, value)?;
        self.hydrate_rows(rows, recursive)
    }

    fn hydrate_rows<T: Record>(&mut self, rows: Vec<T>, recursive: bool) -> Result<Vec<Ref<T>>> {
        let mut handles = Vec::with_capacity(rows.len());
        for row in rows {
            let (handle, is_new) = self.adopt_row(row)?;
            if is_new {
                self.populate(&handle, recursive, true)?;
            }
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Track a fetched row, reusing the existing handle when the tracker
    /// already holds one for its key. Decodes blob columns on first adoption.
    fn adopt_row<T: Record>(&mut self, mut row: T) -> Result<(Ref<T>, bool)> {
        let key = row.key();
        if let Some(existing) = self.tracker.get::<T>(&key) {
            return Ok((existing, false));
        }
        row.decode_blobs(self.codec)?;
        Ok((self.tracker.insert(key, row), true))
    }

    /// Fill one record's navigation fields from storage.
    fn populate<T: Record>(
        &mut self,
        handle: &Ref<T>,
        recursive: bool,
        honor_cascade: bool,
    ) -> Result<()> {
        let owner_key = handle.read().expect("lock poisoned").key();
        let owner = Arc::clone(handle);
        let mut guard = handle.write().expect("lock poisoned");
        let mut pass = ReadPass {
            reader: self,
            owner,
            owner_key,
            recursive,
            honor_cascade,
        };
        guard.walk(&mut pass)
    }

    /// Materialize one related record by key, wiring identity through the
    /// tracker. Returns `None` for dangling keys.
    fn fetch_related<T: Record>(&mut self, key: &Key) -> Result<Option<(Ref<T>, bool)>> {
        resolve::<T>()?;
        if let Some(existing) = self.tracker.get::<T>(key) {
            return Ok(Some((existing, false)));
        }
        let Some(row) = self.store.find::<T>(key)? else {
            return Ok(None);
        };
        Ok(Some(self.adopt_row(row)?))
    }
}

/// One hydration step over one record's navigation fields.
struct ReadPass<'r, 'a, S: Store, C: BlobCodec, O: Record> {
    reader: &'r mut GraphReader<'a, S, C>,
    owner: Ref<O>,
    owner_key: Key,
    recursive: bool,
    honor_cascade: bool,
}

impl<S: Store, C: BlobCodec, O: Record> ReadPass<'_, '_, S, C, O> {
    /// Wire the inverse navigation field of a freshly materialized child back
    /// at the owner, then descend into the child when hydrating recursively.
    fn finish_new_child<T: Record>(
        &mut self,
        child: &Ref<T>,
        back_populates: Option<&'static str>,
    ) -> Result<()> {
        if let Some(field) = back_populates {
            let mut backref = SetBackref {
                field,
                owner: &self.owner,
                owner_key: &self.owner_key,
            };
            child
                .write()
                .expect("lock poisoned")
                .walk(&mut backref)?;
        }
        if self.recursive {
            self.reader.populate(child, true, self.honor_cascade)?;
        }
        Ok(())
    }
}

impl<S: Store, C: BlobCodec, O: Record> LinkWalker for ReadPass<'_, '_, S, C, O> {
    type Error = Error;

    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> Result<()> {
        let info = link.info;
        if self.honor_cascade && !info.cascade.read {
            return Ok(());
        }

        if let Some(fk) = link.fk {
            // FK on the owner: a direct lookup.
            if fk.is_none() {
                *link.nav = None;
                return Ok(());
            }
            match self.reader.fetch_related::<T>(fk)? {
                Some((child, is_new)) => {
                    *link.nav = Some(Arc::clone(&child));
                    if is_new {
                        self.finish_new_child(&child, info.back_populates)?;
                    }
                }
                None => *link.nav = None,
            }
            return Ok(());
        }

        // FK on the related record: query its FK column for the owner key.
        let Some(column) = info.remote_key else {
            return Ok(());
        };
        resolve::<T>()?;
        if self.owner_key.is_none() {
            *link.nav = None;
            return Ok(());
        }
        let rows = self.reader.store.find_where::<T>(column, &self.owner_key)?;
        let Some(row) = rows.into_iter().next() else {
            *link.nav = None;
            return Ok(());
        };
        let (child, is_new) = self.reader.adopt_row(row)?;
        *link.nav = Some(Arc::clone(&child));
        if is_new {
            self.finish_new_child(&child, info.back_populates)?;
        }
        Ok(())
    }

    fn many<T: Record>(&mut self, link: ManyLink<'_, T>) -> Result<()> {
        let info = link.info;
        if self.honor_cascade && !info.cascade.read {
            return Ok(());
        }
        resolve::<T>()?;
        link.nav.clear();
        if self.owner_key.is_none() {
            return Ok(());
        }

        match info.kind {
            RelationshipKind::OneToMany => {
                let Some(column) = info.remote_key else {
                    return Ok(());
                };
                let rows = self.reader.store.find_where::<T>(column, &self.owner_key)?;
                for row in rows {
                    let (child, is_new) = self.reader.adopt_row(row)?;
                    link.nav.push(Arc::clone(&child));
                    if is_new {
                        self.finish_new_child(&child, info.back_populates)?;
                    }
                }
            }
            RelationshipKind::ManyToMany => {
                let Some(link_table) = info.link_table else {
                    return Ok(());
                };
                let far_keys = self.reader.store.link_rows(&link_table, &self.owner_key)?;
                for far_key in far_keys {
                    // Dangling link rows are skipped, not errors.
                    let Some((child, is_new)) = self.reader.fetch_related::<T>(&far_key)? else {
                        continue;
                    };
                    link.nav.push(Arc::clone(&child));
                    if is_new {
                        self.finish_new_child(&child, info.back_populates)?;
                    }
                }
            }
            RelationshipKind::OneToOne | RelationshipKind::ManyToOne => {}
        }
        Ok(())
    }
}
