use async_trait::async_trait;
use replicast_types::{Destination, EntityRef, Payload, RemoteStatus};
use serde_json::Value;

use crate::context::HandlerContext;
use crate::error::ProtocolResult;
use crate::response::{DeleteOutcome, RemoteEntity, SaveResult};
use crate::transport::{Method, RequestBody};

/// Per-entity-kind replication strategy.
///
/// One implementation per kind. Implementations provide the projection and
/// kind-specific payload adjustments; the save/delete state machine is
/// shared. Transitions happen only on confirmed remote responses — a
/// failed request leaves the (entity, destination) pair untouched.
#[async_trait]
pub trait EntityHandler: Send + Sync {
    /// The wrapped entity.
    fn entity(&self) -> EntityRef;

    /// Resource base under the destination's API root.
    fn resource_base(&self) -> &str;

    fn context(&self) -> &HandlerContext;

    /// Payload for the create branch: projected, stripped of
    /// server-assigned fields, references resolved for the destination.
    fn prepare_for_create(&self, destination: &Destination) -> ProtocolResult<Payload>;

    /// Payload for the update branch. Requires an existing descriptor;
    /// updating a never-created entity is a contract violation.
    fn prepare_for_update(&self, destination: &Destination) -> ProtocolResult<Payload>;

    /// Payload for a delete call. Deletes address the replica by id, so
    /// the update projection supplies everything needed.
    fn prepare_for_delete(&self, destination: &Destination) -> ProtocolResult<Payload> {
        self.prepare_for_update(destination)
    }

    /// Body for an outbound request. JSON by default; binary-asset
    /// creation overrides this with a raw body.
    fn request_body(
        &self,
        method: Method,
        payload: Payload,
        destination: &Destination,
    ) -> ProtocolResult<RequestBody> {
        let _ = (method, destination);
        Ok(RequestBody::Json(Value::Object(payload)))
    }

    /// Create or update the entity on one destination.
    ///
    /// Descriptor present → update; absent → create. On success the
    /// returned id/status is written back to the Identity Map before the
    /// result is handed to the caller; failures propagate untouched.
    async fn handle_save(&self, destination: &Destination) -> ProtocolResult<SaveResult> {
        destination.validate()?;
        let ctx = self.context();
        let entity = self.entity();

        let existing = ctx.identity.descriptor(entity, destination.id)?;
        let (method, payload, remote_id, created) = match &existing {
            Some(descriptor) => (
                Method::Put,
                self.prepare_for_update(destination)?,
                Some(descriptor.remote_id),
                false,
            ),
            None => (Method::Post, self.prepare_for_create(destination)?, None, true),
        };

        let body = self.request_body(method, payload, destination)?;
        let request = ctx.request(method, destination, self.resource_base(), remote_id, &[], body)?;
        let response = ctx.dispatch(request).await?;

        let remote = RemoteEntity::from_response(&response)?;
        ctx.identity
            .put(entity, destination.id, Some(remote.descriptor()))?;
        Ok(SaveResult { remote, created })
    }

    /// Delete the entity's replica on one destination.
    ///
    /// No descriptor → no-op success. `force` selects hard delete (entry
    /// cleared on success) over trash (descriptor kept, status updated).
    async fn handle_delete(
        &self,
        destination: &Destination,
        force: bool,
    ) -> ProtocolResult<DeleteOutcome> {
        destination.validate()?;
        let ctx = self.context();
        let entity = self.entity();

        let Some(descriptor) = ctx.identity.descriptor(entity, destination.id)? else {
            return Ok(DeleteOutcome::NothingToDelete);
        };

        let query = [("force", if force { "true" } else { "false" })];
        let request = ctx.request(
            Method::Delete,
            destination,
            self.resource_base(),
            Some(descriptor.remote_id),
            &query,
            RequestBody::Empty,
        )?;
        let response = ctx.dispatch(request).await?;

        if force {
            ctx.identity.put(entity, destination.id, None)?;
            return Ok(DeleteOutcome::Deleted);
        }

        let status = RemoteEntity::from_response(&response)
            .ok()
            .and_then(|remote| remote.status)
            .unwrap_or(RemoteStatus::Trash);
        let mut updated = descriptor;
        updated.status = status;
        ctx.identity.put(entity, destination.id, Some(updated))?;
        Ok(DeleteOutcome::Trashed)
    }
}
