//! Foundation types for the Replicast content replication engine.
//!
//! This crate provides the core identity and descriptor types used
//! throughout the Replicast system. Every other Replicast crate depends on
//! `replicast-types`.
//!
//! # Key Types
//!
//! - [`EntityRef`] — Tagged reference to a local replicable entity
//! - [`DestinationId`] — Stable identifier of a remote endpoint
//! - [`RemoteDescriptor`] — The (remote id, status, secondary ids) record
//!   for one (entity, destination) pair
//! - [`ReplicaSet`] — All remote descriptors of one entity, one per
//!   destination
//! - [`Destination`] — A configured remote endpoint

pub mod descriptor;
pub mod destination;
pub mod entity;
pub mod error;

pub use descriptor::{RemoteDescriptor, RemoteStatus, ReplicaSet, EXTRA_TAXONOMY_REF};
pub use destination::{Destination, DestinationId};
pub use entity::{EntityKind, EntityRef, SourceInfo};
pub use error::TypeError;

/// A serialized wire payload: the object-to-wire projection of an entity.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Reserved names shared across the engine.
pub mod reserved {
    /// Metadata key holding an entity's serialized [`ReplicaSet`](crate::ReplicaSet).
    pub const REMOTE_INFO_KEY: &str = "_replicast_remote_info";

    /// Metadata key carrying origin information to the remote side.
    pub const SOURCE_INFO_KEY: &str = "_replicast_source_info";

    /// Taxonomy whose term assignment selects an entity's destinations.
    pub const DESTINATION_TAXONOMY: &str = "replicast_site";

    /// Name of the composite field in the host's entity serialization.
    pub const FIELD_NAME: &str = "replicast";
}
