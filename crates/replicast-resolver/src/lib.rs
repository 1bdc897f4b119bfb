//! Cross-entity reference rewriting for Replicast payloads.
//!
//! Given a payload for entity E destined for destination D, the resolver
//! replaces every embedded reference to another local entity with that
//! entity's remote id **on D**, looked up through the Identity Map.
//!
//! A reference to an entity with no descriptor on D resolves to an explicit
//! unset value — never to a guessed or local id. That situation is
//! expected, not exceptional: the referenced entity simply has not been
//! replicated to D yet. Callers must supply local ids only; a value that is
//! already a remote id literal is invalid input and comes back unresolvable
//! like any other unknown reference.

pub mod field;
pub mod resolver;
pub mod tree;

pub use field::{FieldValue, ResolvedField};
pub use resolver::ReferenceResolver;
pub use tree::{build_hierarchy, ResolvedTermNode, TermNode};
