//! The relink cascade engine.
//!
//! Composes graph hydration ([`GraphReader`]), graph write cascades
//! ([`GraphWriter`]), per-operation identity tracking
//! ([`IdentityTracker`]), and link-table reconciliation over any
//! [`relink_core::Store`] backend. The engine is synchronous; the facade
//! crate layers the async surface on top.

mod backref;
pub mod links;
pub mod reader;
pub mod tracker;
pub mod writer;

pub use links::{clear_links, reconcile};
pub use reader::GraphReader;
pub use tracker::IdentityTracker;
pub use writer::GraphWriter;
