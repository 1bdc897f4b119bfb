use async_trait::async_trait;
use replicast_types::{Destination, EntityKind, EntityRef, Payload};
use serde_json::Value;

use crate::context::HandlerContext;
use crate::endpoint::resources;
use crate::error::{ProtocolError, ProtocolResult};
use crate::handler::EntityHandler;
use crate::prepare;

use super::{build_envelope, rewrite_translations};

/// Replicates content entities: articles and pages.
pub struct PostHandler {
    ctx: HandlerContext,
    entity: EntityRef,
    resource_base: String,
}

impl PostHandler {
    pub fn new(ctx: HandlerContext, post_id: u64) -> ProtocolResult<Self> {
        let entity = EntityRef::Post(post_id);
        let payload = ctx.projector.project(entity)?;
        let resource_base = match payload.get("type").and_then(Value::as_str) {
            Some("page") => resources::PAGES,
            _ => resources::POSTS,
        };
        Ok(Self {
            ctx,
            entity,
            resource_base: resource_base.to_string(),
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
            payload.remove("author");
        } else {
            prepare::strip_server_assigned(&mut payload);
            prepare::generate_draft_slug(&mut payload);
        }
        prepare::backfill_date_gmt(&mut payload);

        if payload.get("type").and_then(Value::as_str) == Some("page") {
            self.prepare_page(&mut payload);
        }

        // Compose the envelope while the payload still carries local ids;
        // the envelope build resolves them itself.
        let fields = self.ctx.composer.compose(self.entity, &payload)?;

        // The featured asset and parent references resolve per destination,
        // unset when the target has no replica yet.
        if let Some(asset) = prepare::ref_u64(&payload, "featured_media") {
            let resolved = self
                .ctx
                .resolver
                .resolve_entity(EntityRef::Asset(asset), destination.id)?;
            payload.insert("featured_media".into(), opt_value(resolved));
        }
        if let Some(parent) = prepare::ref_u64(&payload, "parent") {
            let resolved = self
                .ctx
                .resolver
                .resolve_entity(EntityRef::Post(parent), destination.id)?;
            payload.insert("parent".into(), opt_value(resolved));
        }
        rewrite_translations(&self.ctx, &mut payload, EntityKind::Post, destination)?;

        let envelope = build_envelope(&self.ctx, self.entity, fields, destination)?;
        payload.insert("replicast".into(), envelope);

        Ok(payload)
    }

    fn prepare_page(&self, payload: &mut Payload) {
        let empty = payload
            .get("template")
            .map_or(false, |t| t.is_null() || t.as_str() == Some(""));
        if empty {
            payload.remove("template");
        }
    }
}

#[async_trait]
impl EntityHandler for PostHandler {
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

fn opt_value(id: Option<u64>) -> Value {
    id.map(Value::from).unwrap_or(Value::Null)
}
