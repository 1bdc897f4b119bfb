//! One handler implementation per entity kind.

mod attachment;
mod post;
mod term;

pub use attachment::AttachmentHandler;
pub use post::PostHandler;
pub use term::TermHandler;

use std::collections::BTreeMap;

use replicast_api::ReplicastFields;
use replicast_resolver::{FieldValue, ReferenceResolver};
use replicast_types::{Destination, EntityKind, EntityRef, Payload};
use serde_json::Value;

use crate::context::HandlerContext;
use crate::error::{ProtocolError, ProtocolResult};
use crate::handler::EntityHandler;

/// The handler for an entity, selected by its kind tag.
pub fn handler_for(
    ctx: HandlerContext,
    entity: EntityRef,
) -> ProtocolResult<Box<dyn EntityHandler>> {
    match entity {
        EntityRef::Post(id) => Ok(Box::new(PostHandler::new(ctx, id)?)),
        EntityRef::Term(id) => Ok(Box::new(TermHandler::new(ctx, id)?)),
        EntityRef::Asset(id) => Ok(Box::new(AttachmentHandler::new(ctx, id))),
    }
}

/// Build the outbound `replicast` envelope for one destination: metadata
/// with typed reference fields rewritten and source info attached, the
/// resolved term tree, and the resolved featured asset.
pub(crate) fn build_envelope(
    ctx: &HandlerContext,
    entity: EntityRef,
    fields: ReplicastFields,
    destination: &Destination,
) -> ProtocolResult<Value> {
    let ReplicastFields {
        mut meta,
        term,
        featured_media,
    } = fields;

    for value in meta.values_mut() {
        if let Some(field) = FieldValue::from_meta(value) {
            *value = ctx.resolver.resolve_field(&field, destination.id)?.to_value();
        }
    }
    let (key, info) = ReferenceResolver::source_info(entity);
    meta.insert(key, info);

    let mut envelope = serde_json::Map::new();
    envelope.insert("meta".into(), Value::Object(meta.into_iter().collect()));
    envelope.insert(
        "term".into(),
        serde_json::to_value(ctx.resolver.resolve_tree(&term, destination.id)?)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?,
    );
    if let Some(mut media) = featured_media {
        media.id = match media.id {
            Some(local) => ctx
                .resolver
                .resolve_entity(EntityRef::Asset(local), destination.id)?,
            None => None,
        };
        envelope.insert(
            "featured_media".into(),
            serde_json::to_value(media).map_err(|e| ProtocolError::Serialization(e.to_string()))?,
        );
    }
    Ok(Value::Object(envelope))
}

/// Rewrite a payload's `translations` map (language → local id) into the
/// destination's id space, dropping unresolved languages.
pub(crate) fn rewrite_translations(
    ctx: &HandlerContext,
    payload: &mut Payload,
    kind: EntityKind,
    destination: &Destination,
) -> ProtocolResult<()> {
    let Some(object) = payload.get("translations").and_then(Value::as_object) else {
        return Ok(());
    };
    let local: BTreeMap<String, u64> = object
        .iter()
        .filter_map(|(lang, id)| id.as_u64().map(|id| (lang.clone(), id)))
        .collect();
    let resolved = ctx
        .resolver
        .resolve_translations(&local, kind, destination.id)?;
    payload.insert(
        "translations".into(),
        serde_json::to_value(resolved).map_err(|e| ProtocolError::Serialization(e.to_string()))?,
    );
    Ok(())
}
