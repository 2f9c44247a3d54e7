//! Per-operation identity tracking.
//!
//! One [`IdentityTracker`] lives for the duration of a single graph
//! operation (or one bulk batch). It guarantees two things: a row reached
//! through several paths materializes as one shared handle, and a handle
//! already processed in this operation is never processed again, which is
//! what terminates traversal of cyclic graphs.

use relink_core::{Key, Record, Ref, new_ref};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Identity map plus visited set for one graph operation.
#[derive(Default)]
pub struct IdentityTracker {
    /// (record type, primary key) -> `Ref<T>` behind `Any`.
    handles: HashMap<(TypeId, Key), Box<dyn Any + Send + Sync>>,
    /// (record type, `Arc` address) of handles already processed.
    ///
    /// Keyed by pointer rather than primary key so that records whose key is
    /// still unassigned (auto-key inserts mid-cascade) are tracked too.
    visited: HashSet<(TypeId, usize)>,
}

impl IdentityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the shared handle for a (type, key) pair.
    #[must_use]
    pub fn get<T: Record>(&self, key: &Key) -> Option<Ref<T>> {
        let entry = self.handles.get(&(TypeId::of::<T>(), key.clone()))?;
        entry.downcast_ref::<Ref<T>>().cloned()
    }

    /// Check whether a (type, key) pair is tracked.
    #[must_use]
    pub fn contains<T: Record>(&self, key: &Key) -> bool {
        self.handles
            .contains_key(&(TypeId::of::<T>(), key.clone()))
    }

    /// Wrap a record in a shared handle and track it under `key`.
    pub fn insert<T: Record>(&mut self, key: Key, record: T) -> Ref<T> {
        let handle = new_ref(record);
        self.adopt(key, &handle);
        handle
    }

    /// Track an existing handle under `key`.
    pub fn adopt<T: Record>(&mut self, key: Key, handle: &Ref<T>) {
        self.handles
            .insert((TypeId::of::<T>(), key), Box::new(Arc::clone(handle)));
    }

    /// Mark a handle as processed. Returns `false` when it was already
    /// marked, in which case the caller must not recurse into it.
    pub fn mark_visited<T: Record>(&mut self, handle: &Ref<T>) -> bool {
        self.visited
            .insert((TypeId::of::<T>(), Arc::as_ptr(handle) as usize))
    }

    /// Number of tracked handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drop all tracked handles and visit marks.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.visited.clear();
    }
}
