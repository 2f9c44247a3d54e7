//! Wiring inverse navigation fields.

use relink_core::{Error, Key, LinkWalker, ManyLink, Record, Ref, SingleLink};
use std::any::Any;
use std::sync::Arc;

/// Sets one named navigation field of a child to point back at its owner.
///
/// The owner handle is smuggled through `Any`: the downcast succeeds exactly
/// on the navigation field whose target type is the owner's type, which
/// together with the field-name check pins the inverse field. When the
/// inverse field carries the foreign key, the key is synced too.
pub(crate) struct SetBackref<'a, O: Record> {
    pub field: &'static str,
    pub owner: &'a Ref<O>,
    pub owner_key: &'a Key,
}

impl<O: Record> LinkWalker for SetBackref<'_, O> {
    type Error = Error;

    fn single<T: Record>(&mut self, link: SingleLink<'_, T>) -> Result<(), Error> {
        if link.info.name != self.field {
            return Ok(());
        }
        let any: &dyn Any = self.owner;
        if let Some(owner) = any.downcast_ref::<Ref<T>>() {
            *link.nav = Some(Arc::clone(owner));
            if let Some(fk) = link.fk {
                *fk = self.owner_key.clone();
            }
        }
        Ok(())
    }

    fn many<T: Record>(&mut self, link: ManyLink<'_, T>) -> Result<(), Error> {
        if link.info.name != self.field {
            return Ok(());
        }
        let any: &dyn Any = self.owner;
        if let Some(owner) = any.downcast_ref::<Ref<T>>() {
            let ptr = Arc::as_ptr(owner) as usize;
            if !link.nav.iter().any(|h| Arc::as_ptr(h) as usize == ptr) {
                link.nav.push(Arc::clone(owner));
            }
        }
        Ok(())
    }
}
