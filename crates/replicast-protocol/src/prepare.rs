//! Shared payload preparation steps.
//!
//! Projections arrive host-shaped; these helpers normalize them for the
//! outbound contract before reference resolution runs.

use replicast_store::slugify;
use replicast_types::Payload;
use serde_json::Value;

/// Host-native relational structures stripped from every outbound payload.
/// Replication flows exclusively through the `replicast` envelope.
pub const SUPPRESSED_STRUCTURES: [&str; 4] = ["categories", "tags", "_links", "_embedded"];

pub fn strip_suppressed_structures(payload: &mut Payload) {
    for key in SUPPRESSED_STRUCTURES {
        payload.remove(key);
    }
}

/// Remove fields the destination assigns itself on creation.
pub fn strip_server_assigned(payload: &mut Payload) {
    payload.remove("id");
    payload.remove("author");
}

/// `date_gmt` is required for updates and zeroed by the host on trash;
/// backfill it from `date` when absent.
pub fn backfill_date_gmt(payload: &mut Payload) {
    let missing = payload
        .get("date_gmt")
        .map_or(true, |v| v.is_null() || v.as_str() == Some(""));
    if !missing {
        return;
    }
    if let Some(date) = payload.get("date").and_then(Value::as_str) {
        if !date.is_empty() {
            payload.insert("date_gmt".into(), Value::from(date));
        }
    }
}

/// Drafts often have no slug yet; generate one from the title so the
/// replica gets a stable path.
pub fn generate_draft_slug(payload: &mut Payload) {
    let has_slug = payload
        .get("slug")
        .and_then(Value::as_str)
        .map_or(false, |s| !s.is_empty());
    if has_slug {
        return;
    }
    if payload.get("status").and_then(Value::as_str) != Some("draft") {
        return;
    }
    if let Some(title) = title_text(payload) {
        let slug = slugify(&title);
        if !slug.is_empty() {
            payload.insert("slug".into(), Value::from(slug));
        }
    }
}

/// A reference value under `key`: a nonzero id. Zero is the host's "none".
pub fn ref_u64(payload: &Payload, key: &str) -> Option<u64> {
    payload.get(key).and_then(Value::as_u64).filter(|id| *id != 0)
}

/// The entity title, whether projected as a plain string or as a
/// `{raw, rendered}` pair.
pub fn title_text(payload: &Payload) -> Option<String> {
    match payload.get("title")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(title) => title
            .get("raw")
            .or_else(|| title.get("rendered"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
