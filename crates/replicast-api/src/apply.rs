use std::collections::BTreeMap;
use std::sync::Arc;

use replicast_resolver::ResolvedTermNode;
use replicast_store::{
    AssetContent, AssetStore, MetadataStore, NewTerm, StoreError, StoreResult, TermStore,
};
use replicast_types::reserved::{REMOTE_INFO_KEY, SOURCE_INFO_KEY};
use replicast_types::EntityRef;
use serde_json::Value;
use tracing::debug;

/// Metadata key linking an entity to its featured asset.
const THUMBNAIL_KEY: &str = "_thumbnail_id";

/// What an incoming field update produced locally.
///
/// `term` is the applied tree with this side's assigned ids filled in,
/// still keyed by the sender's `source` ids — the echo a destination puts
/// in its response so the sender can write descriptors back.
#[derive(Clone, Debug, Default)]
pub struct AppliedFields {
    pub term: Vec<ResolvedTermNode>,
    pub featured_media: Option<u64>,
}

/// Write path: applies an incoming `replicast` field to a local entity.
#[derive(Clone)]
pub struct FieldWriter {
    metadata: Arc<dyn MetadataStore>,
    terms: Arc<dyn TermStore>,
    assets: Arc<dyn AssetStore>,
}

impl FieldWriter {
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

    /// Apply the field's sub-keys to `target`.
    pub fn apply(&self, value: &Value, target: EntityRef) -> StoreResult<AppliedFields> {
        let mut applied = AppliedFields::default();

        if let Some(meta) = value.get("meta").and_then(Value::as_object) {
            self.apply_meta(meta, target)?;
        }
        if let Some(term) = value.get("term") {
            let nodes: Vec<ResolvedTermNode> = serde_json::from_value(term.clone())
                .map_err(|e| StoreError::Serialization(format!("term field: {e}")))?;
            applied.term = self.apply_terms(&nodes, target)?;
        }
        if let Some(media) = value.get("featured_media").filter(|v| !v.is_null()) {
            applied.featured_media = Some(self.apply_featured_media(media, target)?);
        }

        Ok(applied)
    }

    /// Delete-then-write each incoming meta key.
    ///
    /// The replica-set key is never writable from the outside: a peer must
    /// not be able to rewrite this side's own identity map.
    fn apply_meta(
        &self,
        meta: &serde_json::Map<String, Value>,
        target: EntityRef,
    ) -> StoreResult<()> {
        for (key, value) in meta {
            if key == REMOTE_INFO_KEY {
                continue;
            }
            self.metadata.delete(target, key)?;
            self.metadata.write(target, key, value.clone())?;
        }
        Ok(())
    }

    /// Upsert an incoming term forest, parents before children, and
    /// replace the target's assignment per taxonomy.
    fn apply_terms(
        &self,
        nodes: &[ResolvedTermNode],
        target: EntityRef,
    ) -> StoreResult<Vec<ResolvedTermNode>> {
        let mut assigned: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        let echo = nodes
            .iter()
            // A root carrying a parent reference is out of order; skip it.
            .filter(|node| node.parent.is_none())
            .map(|node| self.apply_node(node, None, &mut assigned))
            .collect::<StoreResult<Vec<_>>>()?;

        for (taxonomy, ids) in &assigned {
            self.terms.set_object_terms(target, taxonomy, ids)?;
        }
        debug!(target = %target, taxonomies = assigned.len(), "term assignment applied");
        Ok(echo)
    }

    fn apply_node(
        &self,
        node: &ResolvedTermNode,
        parent: Option<u64>,
        assigned: &mut BTreeMap<String, Vec<u64>>,
    ) -> StoreResult<ResolvedTermNode> {
        let mut new = NewTerm::new(node.taxonomy.clone(), node.name.clone());
        new.slug = (!node.slug.is_empty()).then(|| node.slug.clone());
        new.description = node.description.clone();
        new.parent = parent;
        let term = self.terms.upsert_term(new)?;

        assigned
            .entry(term.taxonomy.clone())
            .or_default()
            .push(term.id);

        let children = node
            .children
            .iter()
            .map(|child| self.apply_node(child, Some(term.id), assigned))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(ResolvedTermNode {
            id: Some(term.id),
            taxonomy_ref: None,
            parent,
            taxonomy: term.taxonomy,
            name: term.name,
            slug: term.slug,
            description: term.description,
            source: node.source,
            translations: node.translations.clone(),
            children,
        })
    }

    /// Attach the incoming featured asset, creating a placeholder asset
    /// when the descriptor carries no local id yet.
    fn apply_featured_media(&self, media: &Value, target: EntityRef) -> StoreResult<u64> {
        let asset_id = match media.get("id").and_then(Value::as_u64) {
            Some(id) if self.assets.read(id)?.is_some() => id,
            _ => {
                let filename = media
                    .get("filename")
                    .and_then(Value::as_str)
                    .unwrap_or("replica")
                    .to_string();
                let mime_type = media
                    .get("mime_type")
                    .and_then(Value::as_str)
                    .unwrap_or("application/octet-stream")
                    .to_string();
                // The body arrives through the media upload call, not this
                // field; a placeholder keeps the attachment linkable.
                let id = self
                    .assets
                    .import(AssetContent::new(filename, mime_type, Vec::new()))?;
                debug!(target = %target, asset = id, "placeholder asset created");
                id
            }
        };

        if let Some(source) = media.get("source").filter(|v| !v.is_null()) {
            self.metadata
                .write(EntityRef::Asset(asset_id), SOURCE_INFO_KEY, source.clone())?;
        }
        self.metadata
            .write(target, THUMBNAIL_KEY, Value::from(asset_id))?;
        Ok(asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replicast_store::{InMemoryAssetStore, InMemoryMetadataStore, InMemoryTermStore};
    use serde_json::json;

    fn writer() -> (
        Arc<InMemoryMetadataStore>,
        Arc<InMemoryTermStore>,
        Arc<InMemoryAssetStore>,
        FieldWriter,
    ) {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let terms = Arc::new(InMemoryTermStore::new());
        let assets = Arc::new(InMemoryAssetStore::new());
        let writer = FieldWriter::new(metadata.clone(), terms.clone(), assets.clone());
        (metadata, terms, assets, writer)
    }

    fn node(source: u64, name: &str, children: Vec<ResolvedTermNode>) -> ResolvedTermNode {
        ResolvedTermNode {
            id: None,
            taxonomy_ref: None,
            parent: None,
            taxonomy: "category".into(),
            name: name.into(),
            slug: replicast_store::slugify(name),
            description: String::new(),
            source,
            translations: BTreeMap::new(),
            children,
        }
    }

    #[test]
    fn applies_meta_with_delete_then_write() {
        let (metadata, _, _, writer) = writer();
        let target = EntityRef::Post(1);
        metadata.write(target, "subtitle", json!("old")).unwrap();

        writer
            .apply(&json!({"meta": {"subtitle": "new"}}), target)
            .unwrap();
        assert_eq!(
            metadata.read(target, "subtitle").unwrap(),
            Some(json!("new"))
        );
    }

    #[test]
    fn replica_set_key_is_not_writable_from_outside() {
        let (metadata, _, _, writer) = writer();
        let target = EntityRef::Post(1);
        writer
            .apply(
                &json!({"meta": {REMOTE_INFO_KEY: {"1": {"id": 666, "status": "publish"}}}}),
                target,
            )
            .unwrap();
        assert!(metadata.read(target, REMOTE_INFO_KEY).unwrap().is_none());
    }

    #[test]
    fn applies_term_tree_parent_before_child() {
        let (_, terms, _, writer) = writer();
        let target = EntityRef::Post(1);
        let tree = vec![node(10, "News", vec![node(11, "World", vec![])])];

        let applied = writer
            .apply(&json!({"term": serde_json::to_value(&tree).unwrap()}), target)
            .unwrap();

        let echo = &applied.term[0];
        let parent_id = echo.id.unwrap();
        let child = &echo.children[0];
        assert_eq!(child.parent, Some(parent_id));
        assert_eq!(echo.source, 10);
        assert_eq!(child.source, 11);

        // The created child really is parented locally.
        let child_term = terms.term(child.id.unwrap()).unwrap().unwrap();
        assert_eq!(child_term.parent, Some(parent_id));

        // Assignment includes both.
        let assigned = terms.object_terms(target).unwrap();
        assert_eq!(assigned.len(), 2);
    }

    #[test]
    fn apply_is_idempotent_for_existing_terms() {
        let (_, terms, _, writer) = writer();
        let target = EntityRef::Post(1);
        let tree = json!({"term": serde_json::to_value(vec![node(10, "News", vec![])]).unwrap()});

        let first = writer.apply(&tree, target).unwrap();
        let second = writer.apply(&tree, target).unwrap();
        assert_eq!(first.term[0].id, second.term[0].id);
        assert_eq!(terms.object_terms(target).unwrap().len(), 1);
    }

    #[test]
    fn skips_out_of_order_roots() {
        let (_, terms, _, writer) = writer();
        let target = EntityRef::Post(1);
        let mut bad = node(10, "News", vec![]);
        bad.parent = Some(77);

        let applied = writer
            .apply(
                &json!({"term": serde_json::to_value(vec![bad]).unwrap()}),
                target,
            )
            .unwrap();
        assert!(applied.term.is_empty());
        assert!(terms.object_terms(target).unwrap().is_empty());
    }

    #[test]
    fn featured_media_with_unknown_id_creates_placeholder() {
        let (metadata, _, assets, writer) = writer();
        let target = EntityRef::Post(1);

        let applied = writer
            .apply(
                &json!({"featured_media": {
                    "id": null,
                    "filename": "cover.jpg",
                    "mime_type": "image/jpeg",
                    "source": {"object_id": 9, "kind": "attachment"}
                }}),
                target,
            )
            .unwrap();

        let asset_id = applied.featured_media.unwrap();
        let content = assets.read(asset_id).unwrap().unwrap();
        assert_eq!(content.filename, "cover.jpg");
        assert!(content.bytes.is_empty());

        assert_eq!(
            metadata.read(target, THUMBNAIL_KEY).unwrap(),
            Some(json!(asset_id))
        );
        let source = metadata
            .read(EntityRef::Asset(asset_id), SOURCE_INFO_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(source["object_id"], json!(9));
    }

    #[test]
    fn featured_media_with_known_id_attaches_directly() {
        let (metadata, _, assets, writer) = writer();
        let target = EntityRef::Post(1);
        assets.insert(5, AssetContent::new("a.png", "image/png", vec![1]));

        let applied = writer
            .apply(&json!({"featured_media": {"id": 5}}), target)
            .unwrap();
        assert_eq!(applied.featured_media, Some(5));
        assert_eq!(metadata.read(target, THUMBNAIL_KEY).unwrap(), Some(json!(5)));
    }
}
