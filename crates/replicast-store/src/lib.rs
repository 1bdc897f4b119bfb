//! Host collaborator interfaces for the Replicast engine.
//!
//! Replicast does not implement persistence, taxonomy storage, or asset
//! storage itself; it orchestrates them. This crate defines the seams the
//! host plugs into:
//!
//! - [`MetadataStore`] — arbitrary key/value metadata attached to an entity
//! - [`TermStore`] — the hierarchical category/tag store
//! - [`AssetStore`] — the binary asset store
//! - [`EntityProjector`] — the object-to-wire projection
//!
//! All traits are object-safe and `Send + Sync`. In-memory implementations
//! are provided for tests and embedding.

pub mod error;
pub mod memory;
pub mod term;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{
    InMemoryAssetStore, InMemoryMetadataStore, InMemoryProjector, InMemoryTermStore,
};
pub use term::{slugify, NewTerm, Term};
pub use traits::{AssetContent, AssetStore, EntityProjector, MetadataStore, TermStore};
