//! The `replicast` composite field.
//!
//! Hosts plug this crate into their entity serialization. The field has
//! three sub-keys — `meta`, `term`, `featured_media` — populated by the
//! read path ([`FieldComposer`]) and consumed by the write path
//! ([`FieldWriter`]) when this instance acts as a destination for another
//! one.
//!
//! The read path composes **local** state: term ids, asset ids, and
//! metadata as stored by the host. Rewriting those ids for a specific
//! destination happens later, in the protocol handlers.

pub mod apply;
pub mod fields;

pub use apply::{AppliedFields, FieldWriter};
pub use fields::{FieldComposer, MediaDescriptor, ReplicastFields};
