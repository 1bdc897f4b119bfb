use replicast_resolver::ResolvedTermNode;
use replicast_types::reserved::FIELD_NAME;
use replicast_types::{RemoteDescriptor, RemoteStatus, EXTRA_TAXONOMY_REF};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::TransportResponse;

/// A destination's JSON representation of a saved entity.
#[derive(Clone, Debug)]
pub struct RemoteEntity {
    /// The identifier the destination assigned.
    pub id: u64,
    pub status: Option<RemoteStatus>,
    /// The full response body.
    pub value: Value,
}

impl RemoteEntity {
    pub fn from_response(response: &TransportResponse) -> ProtocolResult<Self> {
        let value = response.parse_json()?;
        let id = value
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| ProtocolError::Serialization("response entity has no id".into()))?;
        let status = value
            .get("status")
            .and_then(|s| serde_json::from_value(s.clone()).ok());
        Ok(Self { id, status, value })
    }

    /// The descriptor to record for the saved (entity, destination) pair.
    pub fn descriptor(&self) -> RemoteDescriptor {
        let mut descriptor =
            RemoteDescriptor::new(self.id, self.status.unwrap_or(RemoteStatus::Unknown));
        if let Some(taxonomy_ref) = self.value.get("taxonomy_ref").and_then(Value::as_u64) {
            descriptor = descriptor.with_extra(EXTRA_TAXONOMY_REF, taxonomy_ref);
        }
        descriptor
    }

    /// Nested term descriptors discovered in the response.
    ///
    /// A destination that applied the payload's term tree echoes it with
    /// its assigned ids, still keyed by the sender's local `source` ids.
    /// Pairs are returned parent-before-child.
    pub fn term_descriptors(&self) -> Vec<(u64, RemoteDescriptor)> {
        let Some(term) = self
            .value
            .get(FIELD_NAME)
            .and_then(|replicast| replicast.get("term"))
        else {
            return Vec::new();
        };
        let Ok(nodes) = serde_json::from_value::<Vec<ResolvedTermNode>>(term.clone()) else {
            return Vec::new();
        };

        let mut descriptors = Vec::new();
        for root in &nodes {
            root.walk(&mut |node| {
                if let Some(remote_id) = node.id {
                    let mut descriptor = RemoteDescriptor::new(remote_id, RemoteStatus::Unknown);
                    if let Some(taxonomy_ref) = node.taxonomy_ref {
                        descriptor = descriptor.with_extra(EXTRA_TAXONOMY_REF, taxonomy_ref);
                    }
                    descriptors.push((node.source, descriptor));
                }
            });
        }
        descriptors
    }
}

/// Outcome of a `handle_save` call.
#[derive(Clone, Debug)]
pub struct SaveResult {
    pub remote: RemoteEntity,
    /// `true` when the call went through the create branch.
    pub created: bool,
}

/// Outcome of a `handle_delete` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Hard delete confirmed; the identity map entry is cleared.
    Deleted,
    /// Soft delete confirmed; the descriptor is kept with its new status.
    Trashed,
    /// No descriptor existed: nothing to delete remotely.
    NothingToDelete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_id_and_status() {
        let response = TransportResponse::json(201, &json!({"id": 42, "status": "publish"}));
        let remote = RemoteEntity::from_response(&response).unwrap();
        assert_eq!(remote.id, 42);
        assert_eq!(remote.status, Some(RemoteStatus::Publish));
        assert_eq!(remote.descriptor().remote_id, 42);
    }

    #[test]
    fn missing_id_is_an_error() {
        let response = TransportResponse::json(200, &json!({"status": "publish"}));
        assert!(matches!(
            RemoteEntity::from_response(&response),
            Err(ProtocolError::Serialization(_))
        ));
    }

    #[test]
    fn missing_status_maps_to_unknown() {
        let response = TransportResponse::json(200, &json!({"id": 3}));
        let remote = RemoteEntity::from_response(&response).unwrap();
        assert_eq!(remote.status, None);
        assert_eq!(remote.descriptor().status, RemoteStatus::Unknown);
    }

    #[test]
    fn term_response_carries_taxonomy_ref() {
        let response =
            TransportResponse::json(201, &json!({"id": 9, "taxonomy_ref": 19, "status": "publish"}));
        let remote = RemoteEntity::from_response(&response).unwrap();
        assert_eq!(remote.descriptor().taxonomy_ref(), Some(19));
    }

    #[test]
    fn extracts_nested_term_descriptors() {
        let response = TransportResponse::json(
            201,
            &json!({
                "id": 100,
                "status": "publish",
                "replicast": {
                    "term": [{
                        "id": 7,
                        "taxonomy_ref": 70,
                        "parent": null,
                        "taxonomy": "category",
                        "name": "News",
                        "slug": "news",
                        "source": 1,
                        "children": [{
                            "id": 8,
                            "taxonomy_ref": null,
                            "parent": 7,
                            "taxonomy": "category",
                            "name": "World",
                            "slug": "world",
                            "source": 2
                        }]
                    }]
                }
            }),
        );
        let remote = RemoteEntity::from_response(&response).unwrap();
        let descriptors = remote.term_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].0, 1);
        assert_eq!(descriptors[0].1.remote_id, 7);
        assert_eq!(descriptors[0].1.taxonomy_ref(), Some(70));
        assert_eq!(descriptors[1].0, 2);
        assert_eq!(descriptors[1].1.remote_id, 8);
    }

    #[test]
    fn unresolved_echo_nodes_are_skipped() {
        let response = TransportResponse::json(
            201,
            &json!({
                "id": 100,
                "replicast": {
                    "term": [{
                        "id": null,
                        "taxonomy_ref": null,
                        "parent": null,
                        "taxonomy": "category",
                        "name": "News",
                        "slug": "news",
                        "source": 1
                    }]
                }
            }),
        );
        let remote = RemoteEntity::from_response(&response).unwrap();
        assert!(remote.term_descriptors().is_empty());
    }
}
