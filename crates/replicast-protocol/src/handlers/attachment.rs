use async_trait::async_trait;
use md5::{Digest, Md5};
use replicast_types::{Destination, EntityRef, Payload};
use serde_json::Value;

use crate::context::HandlerContext;
use crate::endpoint::resources;
use crate::error::{ProtocolError, ProtocolResult};
use crate::handler::EntityHandler;
use crate::prepare;
use crate::transport::{Method, RequestBody};

use super::build_envelope;

/// Replicates binary assets.
///
/// Creation ships the raw bytes with a content-addressed integrity header
/// instead of a JSON body; updates go through the JSON contract like any
/// other entity.
pub struct AttachmentHandler {
    ctx: HandlerContext,
    entity: EntityRef,
}

impl AttachmentHandler {
    pub fn new(ctx: HandlerContext, asset_id: u64) -> Self {
        Self {
            ctx,
            entity: EntityRef::Asset(asset_id),
        }
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
        }
        prepare::backfill_date_gmt(&mut payload);

        // Assets inherit their parent's status locally; replicas publish.
        if payload.get("status").and_then(Value::as_str) == Some("inherit") {
            payload.insert("status".into(), Value::from("publish"));
        }

        // The "uploaded to" post reference, unset where the post has no
        // replica.
        if let Some(parent) = prepare::ref_u64(&payload, "post") {
            let resolved = self
                .ctx
                .resolver
                .resolve_entity(EntityRef::Post(parent), destination.id)?;
            payload.insert(
                "post".into(),
                resolved.map(Value::from).unwrap_or(Value::Null),
            );
        }

        let fields = self.ctx.composer.compose(self.entity, &payload)?;
        let envelope = build_envelope(&self.ctx, self.entity, fields, destination)?;
        payload.insert("replicast".into(), envelope);

        Ok(payload)
    }
}

#[async_trait]
impl EntityHandler for AttachmentHandler {
    fn entity(&self) -> EntityRef {
        self.entity
    }

    fn resource_base(&self) -> &str {
        resources::MEDIA
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

    fn request_body(
        &self,
        method: Method,
        payload: Payload,
        _destination: &Destination,
    ) -> ProtocolResult<RequestBody> {
        if method != Method::Post {
            return Ok(RequestBody::Json(Value::Object(payload)));
        }

        let id = self.entity.id();
        let content = self
            .ctx
            .assets
            .read(id)?
            .ok_or(ProtocolError::MissingAsset(id))?;
        let content_md5 = hex::encode(Md5::digest(&content.bytes));
        Ok(RequestBody::Binary {
            content_disposition: format!("attachment; filename={}", content.filename),
            content_type: content.mime_type,
            content_md5,
            bytes: content.bytes,
        })
    }
}
