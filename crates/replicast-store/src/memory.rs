//! In-memory collaborator implementations for tests and ephemeral use.
//!
//! All data lives in `HashMap`s behind `RwLock`s and is lost on drop.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use replicast_types::{EntityRef, Payload};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::term::{slugify, NewTerm, Term};
use crate::traits::{AssetContent, AssetStore, EntityProjector, MetadataStore, TermStore};

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Io(format!("lock poisoned: {e}"))
}

/// An in-memory [`MetadataStore`].
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    values: RwLock<HashMap<(EntityRef, String), Value>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn read(&self, entity: EntityRef, key: &str) -> StoreResult<Option<Value>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(&(entity, key.to_string())).cloned())
    }

    fn write(&self, entity: EntityRef, key: &str, value: Value) -> StoreResult<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert((entity, key.to_string()), value);
        Ok(())
    }

    fn delete(&self, entity: EntityRef, key: &str) -> StoreResult<bool> {
        let mut values = self.values.write().map_err(poisoned)?;
        Ok(values.remove(&(entity, key.to_string())).is_some())
    }

    fn read_all(&self, entity: EntityRef) -> StoreResult<BTreeMap<String, Value>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values
            .iter()
            .filter(|((e, _), _)| *e == entity)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// An in-memory [`TermStore`].
#[derive(Debug, Default)]
pub struct InMemoryTermStore {
    terms: RwLock<HashMap<u64, Term>>,
    assignments: RwLock<HashMap<EntityRef, Vec<u64>>>,
    translations: RwLock<HashMap<u64, BTreeMap<String, u64>>>,
    next_id: AtomicU64,
}

impl InMemoryTermStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Seed a term with a fixed id.
    pub fn insert(&self, term: Term) {
        let mut terms = self.terms.write().expect("lock poisoned");
        let floor = term.id + 1;
        if self.next_id.load(Ordering::SeqCst) < floor {
            self.next_id.store(floor, Ordering::SeqCst);
        }
        terms.insert(term.id, term);
    }

    /// Assign terms to an object (appended across calls, deduplicated).
    pub fn assign(&self, object: EntityRef, term_ids: &[u64]) {
        let mut assignments = self.assignments.write().expect("lock poisoned");
        let entry = assignments.entry(object).or_default();
        for id in term_ids {
            if !entry.contains(id) {
                entry.push(*id);
            }
        }
    }

    /// Seed a translation map for a term.
    pub fn set_term_translations(&self, id: u64, map: BTreeMap<String, u64>) {
        let mut translations = self.translations.write().expect("lock poisoned");
        translations.insert(id, map);
    }
}

impl TermStore for InMemoryTermStore {
    fn term(&self, id: u64) -> StoreResult<Option<Term>> {
        let terms = self.terms.read().map_err(poisoned)?;
        Ok(terms.get(&id).cloned())
    }

    fn object_terms(&self, object: EntityRef) -> StoreResult<Vec<Term>> {
        let assignments = self.assignments.read().map_err(poisoned)?;
        let terms = self.terms.read().map_err(poisoned)?;
        let ids = assignments.get(&object).cloned().unwrap_or_default();
        Ok(ids.iter().filter_map(|id| terms.get(id).cloned()).collect())
    }

    fn upsert_term(&self, new: NewTerm) -> StoreResult<Term> {
        let mut terms = self.terms.write().map_err(poisoned)?;
        if let Some(existing) = terms.values().find(|t| {
            t.taxonomy == new.taxonomy && t.name == new.name && t.parent == new.parent
        }) {
            return Ok(existing.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let term = Term {
            id,
            slug: new.slug.unwrap_or_else(|| slugify(&new.name)),
            taxonomy: new.taxonomy,
            name: new.name,
            description: new.description,
            parent: new.parent,
        };
        terms.insert(id, term.clone());
        Ok(term)
    }

    fn set_object_terms(&self, object: EntityRef, taxonomy: &str, ids: &[u64]) -> StoreResult<()> {
        let terms = self.terms.read().map_err(poisoned)?;
        let mut assignments = self.assignments.write().map_err(poisoned)?;
        let entry = assignments.entry(object).or_default();
        // Replace only the assignment within this taxonomy.
        entry.retain(|id| {
            terms
                .get(id)
                .map(|t| t.taxonomy != taxonomy)
                .unwrap_or(false)
        });
        entry.extend_from_slice(ids);
        Ok(())
    }

    fn term_translations(&self, id: u64) -> StoreResult<BTreeMap<String, u64>> {
        let translations = self.translations.read().map_err(poisoned)?;
        Ok(translations.get(&id).cloned().unwrap_or_default())
    }
}

/// An in-memory [`AssetStore`].
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    assets: RwLock<HashMap<u64, AssetContent>>,
    next_id: AtomicU64,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Seed an asset with a fixed id.
    pub fn insert(&self, id: u64, content: AssetContent) {
        let mut assets = self.assets.write().expect("lock poisoned");
        let floor = id + 1;
        if self.next_id.load(Ordering::SeqCst) < floor {
            self.next_id.store(floor, Ordering::SeqCst);
        }
        assets.insert(id, content);
    }
}

impl AssetStore for InMemoryAssetStore {
    fn read(&self, id: u64) -> StoreResult<Option<AssetContent>> {
        let assets = self.assets.read().map_err(poisoned)?;
        Ok(assets.get(&id).cloned())
    }

    fn import(&self, content: AssetContent) -> StoreResult<u64> {
        let mut assets = self.assets.write().map_err(poisoned)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        assets.insert(id, content);
        Ok(id)
    }
}

/// An in-memory [`EntityProjector`] serving fixed projections.
#[derive(Debug, Default)]
pub struct InMemoryProjector {
    payloads: RwLock<HashMap<EntityRef, Payload>>,
}

impl InMemoryProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the projection for an entity.
    pub fn set(&self, entity: EntityRef, payload: Payload) {
        let mut payloads = self.payloads.write().expect("lock poisoned");
        payloads.insert(entity, payload);
    }
}

impl EntityProjector for InMemoryProjector {
    fn project(&self, entity: EntityRef) -> StoreResult<Payload> {
        let payloads = self.payloads.read().map_err(poisoned)?;
        payloads
            .get(&entity)
            .cloned()
            .ok_or(StoreError::NotFound(entity))
    }
}
