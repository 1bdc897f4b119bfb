//! The Identity Map: durable mapping from (local entity, destination) to
//! remote descriptor.
//!
//! The storage substrate is the host's [`MetadataStore`]; this crate only
//! defines the encode/decode and upsert/delete semantics. Each entity's
//! full [`ReplicaSet`] is persisted as one metadata blob under a reserved
//! key, with the flat layout `{ destination_id: { id, status, extra_ids? } }`.
//!
//! Descriptor presence is the sole source of truth for create-vs-update
//! decisions; there is no separate dirty flag. Both operations are
//! last-write-wins, and storage I/O failure is surfaced to the caller.

use std::sync::{Arc, Mutex};

use replicast_store::{MetadataStore, StoreError, StoreResult};
use replicast_types::reserved::REMOTE_INFO_KEY;
use replicast_types::{DestinationId, EntityRef, RemoteDescriptor, ReplicaSet};
use tracing::debug;

/// Reads and writes replica sets through the host metadata store.
///
/// An entity's replica set is one blob, so [`put`](IdentityMap::put) is a
/// read-modify-write. Writes are serialized across clones of the same map;
/// concurrent per-destination chains touching the same entity cannot lose
/// each other's descriptors.
#[derive(Clone)]
pub struct IdentityMap {
    metadata: Arc<dyn MetadataStore>,
    write_lock: Arc<Mutex<()>>,
}

impl IdentityMap {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            metadata,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The entity's replica set. Empty if the entity has never been
    /// replicated.
    pub fn get(&self, entity: EntityRef) -> StoreResult<ReplicaSet> {
        match self.metadata.read(entity, REMOTE_INFO_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                StoreError::Serialization(format!("replica set for {entity}: {e}"))
            }),
            None => Ok(ReplicaSet::new()),
        }
    }

    /// The descriptor for one (entity, destination) pair, if any.
    pub fn descriptor(
        &self,
        entity: EntityRef,
        destination: DestinationId,
    ) -> StoreResult<Option<RemoteDescriptor>> {
        Ok(self.get(entity)?.get(destination).cloned())
    }

    /// Upsert (`Some`) or remove (`None`) the descriptor for a destination.
    ///
    /// The replica set blob is created lazily on the first upsert and
    /// deleted once the last descriptor is removed.
    pub fn put(
        &self,
        entity: EntityRef,
        destination: DestinationId,
        descriptor: Option<RemoteDescriptor>,
    ) -> StoreResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Io(format!("lock poisoned: {e}")))?;
        let mut set = self.get(entity)?;

        match descriptor {
            Some(descriptor) => {
                debug!(
                    entity = %entity,
                    destination = %destination,
                    remote_id = descriptor.remote_id,
                    status = %descriptor.status,
                    "descriptor upserted"
                );
                set.upsert(destination, descriptor);
            }
            None => {
                if !set.remove(destination) {
                    return Ok(());
                }
                debug!(entity = %entity, destination = %destination, "descriptor removed");
                if set.is_empty() {
                    self.metadata.delete(entity, REMOTE_INFO_KEY)?;
                    return Ok(());
                }
            }
        }

        let value = serde_json::to_value(&set)
            .map_err(|e| StoreError::Serialization(format!("replica set for {entity}: {e}")))?;
        self.metadata.write(entity, REMOTE_INFO_KEY, value)
    }
}
