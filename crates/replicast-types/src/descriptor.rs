use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::destination::DestinationId;

/// `extra_ids` key for the taxonomy-relationship id of a replicated term,
/// distinct from the term id itself.
pub const EXTRA_TAXONOMY_REF: &str = "taxonomy_ref";

/// Publication status of a remote replica, as reported by the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
    Inherit,
    /// A status this engine does not model. Kept so an unexpected remote
    /// status never loses the descriptor.
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    /// `true` if the replica sits in the destination's trash.
    pub fn is_trashed(&self) -> bool {
        matches!(self, Self::Trash)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Publish => "publish",
            Self::Future => "future",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
            Self::Trash => "trash",
            Self::Inherit => "inherit",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The record pairing one local entity with one destination.
///
/// A descriptor exists for destination D iff the entity has been
/// successfully created on D and not subsequently hard-deleted from D.
/// Presence of the descriptor is the sole create-vs-update signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDescriptor {
    /// The identifier assigned by the destination.
    #[serde(rename = "id")]
    pub remote_id: u64,
    /// Last confirmed status on the destination.
    pub status: RemoteStatus,
    /// Kind-specific secondary identifiers, keyed by a stable name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_ids: BTreeMap<String, u64>,
}

impl RemoteDescriptor {
    /// A descriptor with no secondary identifiers.
    pub fn new(remote_id: u64, status: RemoteStatus) -> Self {
        Self {
            remote_id,
            status,
            extra_ids: BTreeMap::new(),
        }
    }

    /// Attach a secondary identifier.
    pub fn with_extra(mut self, key: impl Into<String>, id: u64) -> Self {
        self.extra_ids.insert(key.into(), id);
        self
    }

    /// The taxonomy-relationship id, if this descriptor carries one.
    pub fn taxonomy_ref(&self) -> Option<u64> {
        self.extra_ids.get(EXTRA_TAXONOMY_REF).copied()
    }
}

/// All remote descriptors of one entity, one per destination.
///
/// Persisted as a single metadata blob with the flat layout
/// `{ destination_id: { id, status, extra_ids? } }`. Both mutation
/// operations are last-write-wins; there is no versioning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaSet {
    entries: BTreeMap<DestinationId, RemoteDescriptor>,
}

impl ReplicaSet {
    /// An empty replica set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor for one destination, if the entity exists there.
    pub fn get(&self, destination: DestinationId) -> Option<&RemoteDescriptor> {
        self.entries.get(&destination)
    }

    /// `true` if a descriptor exists for the destination.
    pub fn contains(&self, destination: DestinationId) -> bool {
        self.entries.contains_key(&destination)
    }

    /// Insert or replace the descriptor for a destination.
    pub fn upsert(&mut self, destination: DestinationId, descriptor: RemoteDescriptor) {
        self.entries.insert(destination, descriptor);
    }

    /// Remove the descriptor for a destination. Returns `true` if one
    /// existed.
    pub fn remove(&mut self, destination: DestinationId) -> bool {
        self.entries.remove(&destination).is_some()
    }

    /// Destinations this entity currently has replicas on.
    pub fn destinations(&self) -> impl Iterator<Item = DestinationId> + '_ {
        self.entries.keys().copied()
    }

    /// Iterate over (destination, descriptor) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DestinationId, &RemoteDescriptor)> {
        self.entries.iter().map(|(d, r)| (*d, r))
    }

    /// Number of destinations with a descriptor.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the entity has no remote replicas.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
