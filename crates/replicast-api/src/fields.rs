use std::collections::BTreeMap;
use std::sync::Arc;

use replicast_resolver::{build_hierarchy, TermNode};
use replicast_store::{AssetStore, MetadataStore, StoreResult, TermStore};
use replicast_types::reserved::FIELD_NAME;
use replicast_types::{EntityRef, Payload, SourceInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A featured asset, described for the remote side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Local asset id on the read path; rewritten per destination before
    /// dispatch.
    pub id: Option<u64>,
    pub filename: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
}

/// The composite field value: local metadata, the hierarchical term
/// forest, and the featured asset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplicastFields {
    pub meta: BTreeMap<String, Value>,
    pub term: Vec<TermNode>,
    pub featured_media: Option<MediaDescriptor>,
}

impl ReplicastFields {
    /// Serialize for the host's entity serialization (the field's
    /// `get` callback).
    pub fn to_value(&self) -> StoreResult<Value> {
        let mut map = serde_json::Map::new();
        map.insert(
            "meta".into(),
            Value::Object(self.meta.clone().into_iter().collect()),
        );
        map.insert(
            "term".into(),
            serde_json::to_value(&self.term)
                .map_err(|e| replicast_store::StoreError::Serialization(e.to_string()))?,
        );
        if let Some(media) = &self.featured_media {
            map.insert(
                "featured_media".into(),
                serde_json::to_value(media)
                    .map_err(|e| replicast_store::StoreError::Serialization(e.to_string()))?,
            );
        }
        Ok(Value::Object(map))
    }
}

/// Read path: builds [`ReplicastFields`] from the host stores.
#[derive(Clone)]
pub struct FieldComposer {
    metadata: Arc<dyn MetadataStore>,
    terms: Arc<dyn TermStore>,
    assets: Arc<dyn AssetStore>,
}

impl FieldComposer {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        terms: Arc<dyn TermStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            metadata,
            terms,
            assets,
        }
    }

    /// The name of the composite field in the host serialization.
    pub fn field_name() -> &'static str {
        FIELD_NAME
    }

    /// Compose the field for an entity.
    ///
    /// `payload` is the entity's projection; the featured asset reference
    /// is read from it.
    pub fn compose(&self, entity: EntityRef, payload: &Payload) -> StoreResult<ReplicastFields> {
        Ok(ReplicastFields {
            meta: self.compose_meta(entity)?,
            term: self.compose_terms(entity)?,
            featured_media: self.compose_featured_media(payload)?,
        })
    }

    /// Public metadata of the entity. Protected keys (leading underscore)
    /// stay host-private.
    fn compose_meta(&self, entity: EntityRef) -> StoreResult<BTreeMap<String, Value>> {
        let mut meta = self.metadata.read_all(entity)?;
        meta.retain(|key, _| !key.starts_with('_'));
        Ok(meta)
    }

    /// The entity's term assignment as a hierarchical forest, with
    /// translation maps attached where the host tracks them.
    fn compose_terms(&self, entity: EntityRef) -> StoreResult<Vec<TermNode>> {
        let terms = self.terms.object_terms(entity)?;
        let mut translations = BTreeMap::new();
        for term in &terms {
            let map = self.terms.term_translations(term.id)?;
            if !map.is_empty() {
                translations.insert(term.id, map);
            }
        }
        Ok(build_hierarchy(&terms, &translations))
    }

    fn compose_featured_media(&self, payload: &Payload) -> StoreResult<Option<MediaDescriptor>> {
        let Some(id) = payload.get("featured_media").and_then(Value::as_u64) else {
            return Ok(None);
        };
        if id == 0 {
            return Ok(None);
        }
        let Some(content) = self.assets.read(id)? else {
            return Ok(None);
        };
        Ok(Some(MediaDescriptor {
            id: Some(id),
            filename: content.filename,
            mime_type: content.mime_type,
            source: Some(SourceInfo::new(EntityRef::Asset(id))),
        }))
    }
}
