use std::collections::BTreeMap;

use replicast_types::{EntityRef, Payload};
use serde_json::Value;

use crate::error::StoreResult;
use crate::term::{NewTerm, Term};

/// Persistent key/value metadata attached to an entity.
///
/// Writes are last-write-wins per (entity, key); the store keeps no
/// versions. I/O failures are propagated, never retried here.
pub trait MetadataStore: Send + Sync {
    /// Read one metadata value. `Ok(None)` if the key is unset.
    fn read(&self, entity: EntityRef, key: &str) -> StoreResult<Option<Value>>;

    /// Write (create or replace) one metadata value.
    fn write(&self, entity: EntityRef, key: &str, value: Value) -> StoreResult<()>;

    /// Delete one metadata value. Returns `true` if the key existed.
    fn delete(&self, entity: EntityRef, key: &str) -> StoreResult<bool>;

    /// All metadata of an entity.
    fn read_all(&self, entity: EntityRef) -> StoreResult<BTreeMap<String, Value>>;
}

/// The host's hierarchical category/tag store.
pub trait TermStore: Send + Sync {
    /// Look up a term by id. `Ok(None)` if it does not exist.
    fn term(&self, id: u64) -> StoreResult<Option<Term>>;

    /// All terms assigned to a content entity, across taxonomies.
    fn object_terms(&self, object: EntityRef) -> StoreResult<Vec<Term>>;

    /// Find or create a term by (taxonomy, name, parent).
    ///
    /// An existing match is returned as-is; otherwise the term is created
    /// with a freshly assigned id.
    fn upsert_term(&self, term: NewTerm) -> StoreResult<Term>;

    /// Replace the object's term assignment within one taxonomy.
    fn set_object_terms(&self, object: EntityRef, taxonomy: &str, ids: &[u64]) -> StoreResult<()>;

    /// Language → term id translation map for a term.
    ///
    /// Hosts without translation support keep the default (empty).
    fn term_translations(&self, id: u64) -> StoreResult<BTreeMap<String, u64>> {
        let _ = id;
        Ok(BTreeMap::new())
    }
}

/// The raw content of a binary asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetContent {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AssetContent {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// The host's binary asset store.
pub trait AssetStore: Send + Sync {
    /// Read an asset's content. `Ok(None)` if it does not exist.
    fn read(&self, id: u64) -> StoreResult<Option<AssetContent>>;

    /// Store new asset content and return its assigned id.
    fn import(&self, content: AssetContent) -> StoreResult<u64>;
}

/// The host-provided object-to-wire projection.
///
/// Produces the canonical serialized representation of a local entity: the
/// flat attribute map the remote API speaks. Reference fields in the
/// projection carry **local** identifiers; rewriting them per destination
/// is the engine's job.
pub trait EntityProjector: Send + Sync {
    fn project(&self, entity: EntityRef) -> StoreResult<Payload>;
}
