//! Link-table reconciliation for many-to-many relationships.

use relink_core::{Key, LinkTableInfo, Result, Store};
use std::collections::HashSet;

/// Reconcile the link rows for one owner against its in-memory association
/// list.
///
/// Link rows present in storage but absent from `desired` are deleted; pairs
/// in `desired` but absent from storage are inserted. Pairs present on both
/// sides are left untouched, so reconciliation never churns rows that did
/// not change. Keys equal to [`Key::None`] in `desired` are skipped (the far
/// record has no identity yet; the caller writes it first).
pub fn reconcile<S: Store>(
    store: &S,
    link: &LinkTableInfo,
    owner_key: &Key,
    desired: &[Key],
) -> Result<()> {
    let existing: HashSet<Key> = store.link_rows(link, owner_key)?.into_iter().collect();
    let wanted: HashSet<&Key> = desired.iter().filter(|k| k.is_some()).collect();

    let mut inserted = 0_usize;
    let mut deleted = 0_usize;

    for far in &wanted {
        if !existing.contains(*far) {
            store.insert_link(link, owner_key, far)?;
            inserted += 1;
        }
    }
    for far in &existing {
        if !wanted.contains(far) {
            store.delete_link(link, owner_key, far)?;
            deleted += 1;
        }
    }

    if inserted > 0 || deleted > 0 {
        tracing::debug!(
            link_table = link.table_name,
            owner = %owner_key,
            inserted,
            deleted,
            "link rows reconciled"
        );
    }
    Ok(())
}

/// Delete every link row referencing `owner_key` on the near side.
pub fn clear_links<S: Store>(store: &S, link: &LinkTableInfo, owner_key: &Key) -> Result<()> {
    store.clear_links_for(link, owner_key)
}
