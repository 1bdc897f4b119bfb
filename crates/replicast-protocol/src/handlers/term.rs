use async_trait::async_trait;
use replicast_types::{Destination, EntityKind, EntityRef, Payload};
use serde_json::Value;

use crate::context::HandlerContext;
use crate::endpoint::taxonomy_resource;
use crate::error::{ProtocolError, ProtocolResult};
use crate::handler::EntityHandler;
use crate::prepare;

use super::{build_envelope, rewrite_translations};

/// Replicates a single taxonomy term.
///
/// Trees attached to a content entity travel inside that entity's
/// envelope; this handler covers a term edited on its own.
pub struct TermHandler {
    ctx: HandlerContext,
    entity: EntityRef,
    resource_base: String,
}

impl TermHandler {
    pub fn new(ctx: HandlerContext, term_id: u64) -> ProtocolResult<Self> {
        let entity = EntityRef::Term(term_id);
        let payload = ctx.projector.project(entity)?;
        let taxonomy = payload
            .get("taxonomy")
            .and_then(Value::as_str)
            .unwrap_or("category");
        let resource_base = taxonomy_resource(taxonomy).to_string();
        Ok(Self {
            ctx,
            entity,
            resource_base,
        })
    }

    fn prepare(&self, destination: &Destination, for_update: bool) -> ProtocolResult<Payload> {
        let mut payload = self.ctx.projector.project(self.entity)?;
        prepare::strip_suppressed_structures(&mut payload);

        if for_update {
            let descriptor = self
                .ctx
                .identity
                .descriptor(self.entity, destination.id)?
                .ok_or_else(|| {
                    ProtocolError::Contract(format!(
                        "cannot update {} on destination {}: never created there",
                        self.entity, destination.id
                    ))
                })?;
            payload.insert("id".into(), Value::from(descriptor.remote_id));
        } else {
            payload.remove("id");
        }

        // A parent reference resolves only where the parent itself has a
        // replica; otherwise the destination roots the term.
        if let Some(parent) = prepare::ref_u64(&payload, "parent") {
            let resolved = self
                .ctx
                .resolver
                .resolve_entity(EntityRef::Term(parent), destination.id)?;
            payload.insert(
                "parent".into(),
                resolved.map(Value::from).unwrap_or(Value::Null),
            );
        }
        rewrite_translations(&self.ctx, &mut payload, EntityKind::Term, destination)?;

        let fields = self.ctx.composer.compose(self.entity, &payload)?;
        let envelope = build_envelope(&self.ctx, self.entity, fields, destination)?;
        payload.insert("replicast".into(), envelope);

        Ok(payload)
    }
}

#[async_trait]
impl EntityHandler for TermHandler {
    fn entity(&self) -> EntityRef {
        self.entity
    }

    fn resource_base(&self) -> &str {
        &self.resource_base
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    fn prepare_for_create(&self, destination: &Destination) -> ProtocolResult<Payload> {
        self.prepare(destination, false)
    }

    fn prepare_for_update(&self, destination: &Destination) -> ProtocolResult<Payload> {
        self.prepare(destination, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use replicast_store::{
        InMemoryAssetStore, InMemoryMetadataStore, InMemoryProjector, InMemoryTermStore,
    };
    use replicast_types::{DestinationId, RemoteDescriptor, RemoteStatus, EXTRA_TAXONOMY_REF};
    use serde_json::json;

    use crate::scripted::ScriptedTransport;
    use crate::transport::Method;

    fn fixture() -> (Arc<InMemoryProjector>, Arc<ScriptedTransport>, HandlerContext) {
        let projector = Arc::new(InMemoryProjector::new());
        let transport = Arc::new(ScriptedTransport::new());
        let ctx = HandlerContext::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryTermStore::new()),
            Arc::new(InMemoryAssetStore::new()),
            projector.clone(),
            transport.clone(),
        );
        (projector, transport, ctx)
    }

    fn destination(id: u64) -> Destination {
        Destination {
            id: DestinationId(id),
            base_url: "https://remote.example/wp-json/wp/v2".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            kinds: Default::default(),
        }
    }

    #[tokio::test]
    async fn category_maps_to_categories_resource() {
        let (projector, transport, ctx) = fixture();
        projector.set(
            EntityRef::Term(5),
            json!({"id": 5, "taxonomy": "category", "name": "News", "slug": "news", "parent": 0})
                .as_object()
                .cloned()
                .unwrap(),
        );
        transport.respond_json(
            Method::Post,
            "/categories/",
            201,
            json!({"id": 50, "taxonomy_ref": 55, "status": "publish"}),
        );

        let handler = TermHandler::new(ctx.clone(), 5).unwrap();
        assert_eq!(handler.resource_base(), "categories");

        let result = handler.handle_save(&destination(1)).await.unwrap();
        assert!(result.created);

        // The secondary id from the response is kept in extra_ids.
        let descriptor = ctx
            .identity
            .descriptor(EntityRef::Term(5), DestinationId(1))
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.remote_id, 50);
        assert_eq!(descriptor.extra_ids[EXTRA_TAXONOMY_REF], 55);
    }

    #[tokio::test]
    async fn parent_reference_resolves_or_unsets() {
        let (projector, _, ctx) = fixture();
        projector.set(
            EntityRef::Term(6),
            json!({"id": 6, "taxonomy": "category", "name": "World", "parent": 5})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let handler = TermHandler::new(ctx.clone(), 6).unwrap();
        let payload = handler.prepare_for_create(&destination(1)).unwrap();
        assert_eq!(payload["parent"], serde_json::Value::Null);

        ctx.identity
            .put(
                EntityRef::Term(5),
                DestinationId(1),
                Some(RemoteDescriptor::new(50, RemoteStatus::Unknown)),
            )
            .unwrap();
        let payload = handler.prepare_for_create(&destination(1)).unwrap();
        assert_eq!(payload["parent"], json!(50));
    }

    #[tokio::test]
    async fn custom_taxonomy_uses_its_own_resource() {
        let (projector, _, ctx) = fixture();
        projector.set(
            EntityRef::Term(7),
            json!({"id": 7, "taxonomy": "genre", "name": "Jazz"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let handler = TermHandler::new(ctx, 7).unwrap();
        assert_eq!(handler.resource_base(), "genre");
    }
}
