use std::collections::BTreeMap;

use replicast_identity::IdentityMap;
use replicast_store::StoreResult;
use replicast_types::reserved::SOURCE_INFO_KEY;
use replicast_types::{DestinationId, EntityKind, EntityRef, SourceInfo};
use tracing::trace;

use crate::field::{FieldValue, ResolvedField};
use crate::tree::{ResolvedTermNode, TermNode};

/// Rewrites local references into one destination's identifier space.
#[derive(Clone)]
pub struct ReferenceResolver {
    identity: IdentityMap,
}

impl ReferenceResolver {
    pub fn new(identity: IdentityMap) -> Self {
        Self { identity }
    }

    /// Resolve a scalar reference.
    ///
    /// `None` means the referenced entity has no replica on the destination;
    /// the caller emits an explicit unset value, never the local id.
    pub fn resolve_entity(
        &self,
        entity: EntityRef,
        destination: DestinationId,
    ) -> StoreResult<Option<u64>> {
        let resolved = self
            .identity
            .descriptor(entity, destination)?
            .map(|d| d.remote_id);
        trace!(entity = %entity, destination = %destination, ?resolved, "reference resolved");
        Ok(resolved)
    }

    /// Resolve a list of references, dropping elements with no replica so
    /// no dangling local id leaves the engine.
    pub fn resolve_list(
        &self,
        entities: impl IntoIterator<Item = EntityRef>,
        destination: DestinationId,
    ) -> StoreResult<Vec<u64>> {
        let mut resolved = Vec::new();
        for entity in entities {
            if let Some(id) = self.resolve_entity(entity, destination)? {
                resolved.push(id);
            }
        }
        Ok(resolved)
    }

    /// Resolve a typed reference field.
    ///
    /// All shapes share the scalar lookup; taxonomy fields surface the
    /// taxonomy-relationship id from `extra_ids` instead of the term id.
    pub fn resolve_field(
        &self,
        field: &FieldValue,
        destination: DestinationId,
    ) -> StoreResult<ResolvedField> {
        match field {
            FieldValue::Image(id) => Ok(ResolvedField::Scalar(
                self.resolve_entity(EntityRef::Asset(*id), destination)?,
            )),
            FieldValue::Gallery(ids) => Ok(ResolvedField::List(self.resolve_list(
                ids.iter().map(|id| EntityRef::Asset(*id)),
                destination,
            )?)),
            FieldValue::Relationship(ids) => Ok(ResolvedField::List(self.resolve_list(
                ids.iter().map(|id| EntityRef::Post(*id)),
                destination,
            )?)),
            FieldValue::Taxonomy(ids) => {
                let mut resolved = Vec::new();
                for id in ids {
                    let descriptor = self.identity.descriptor(EntityRef::Term(*id), destination)?;
                    if let Some(taxonomy_ref) = descriptor.and_then(|d| d.taxonomy_ref()) {
                        resolved.push(taxonomy_ref);
                    }
                }
                Ok(ResolvedField::List(resolved))
            }
        }
    }

    /// Rewrite a translations map (language → local id) for one
    /// destination. Unresolvable entries are dropped.
    pub fn resolve_translations(
        &self,
        translations: &BTreeMap<String, u64>,
        kind: EntityKind,
        destination: DestinationId,
    ) -> StoreResult<BTreeMap<String, u64>> {
        let mut resolved = BTreeMap::new();
        for (language, local_id) in translations {
            let entity = EntityRef::new(kind, *local_id);
            if let Some(remote_id) = self.resolve_entity(entity, destination)? {
                resolved.insert(language.clone(), remote_id);
            }
        }
        Ok(resolved)
    }

    /// Resolve a term forest for one destination, depth-first and
    /// parent-before-child.
    ///
    /// A node's own remote id is resolved before its children are visited,
    /// so a parent's id can be threaded into the children within the same
    /// outbound call. Nodes without a descriptor are emitted with unset
    /// id/parent and are created by the destination, which returns the
    /// assigned id keyed by the node's `source`.
    pub fn resolve_tree(
        &self,
        roots: &[TermNode],
        destination: DestinationId,
    ) -> StoreResult<Vec<ResolvedTermNode>> {
        roots
            .iter()
            .map(|node| self.resolve_node(node, None, destination))
            .collect()
    }

    fn resolve_node(
        &self,
        node: &TermNode,
        parent_remote: Option<u64>,
        destination: DestinationId,
    ) -> StoreResult<ResolvedTermNode> {
        let local = EntityRef::Term(node.term.id);
        let descriptor = self.identity.descriptor(local, destination)?;

        let id = descriptor.as_ref().map(|d| d.remote_id);
        let taxonomy_ref = descriptor.as_ref().and_then(|d| d.taxonomy_ref());
        // A node is parented only once it exists remotely; fresh nodes are
        // re-parented by the destination on creation.
        let parent = if descriptor.is_some() { parent_remote } else { None };

        let children = node
            .children
            .iter()
            .map(|child| self.resolve_node(child, id, destination))
            .collect::<StoreResult<Vec<_>>>()?;

        let translations =
            self.resolve_translations(&node.translations, EntityKind::Term, destination)?;

        Ok(ResolvedTermNode {
            id,
            taxonomy_ref,
            parent,
            taxonomy: node.term.taxonomy.clone(),
            name: node.term.name.clone(),
            slug: node.term.slug.clone(),
            description: node.term.description.clone(),
            source: node.term.id,
            translations,
            children,
        })
    }

    /// Source-info metadata entry for an outbound payload or term node.
    pub fn source_info(entity: EntityRef) -> (String, serde_json::Value) {
        let info = SourceInfo::new(entity);
        (
            SOURCE_INFO_KEY.to_string(),
            serde_json::to_value(info).unwrap_or(serde_json::Value::Null),
        )
    }
}
