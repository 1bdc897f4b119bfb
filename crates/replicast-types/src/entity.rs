use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a replicable entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A content item (article or page).
    Post,
    /// A hierarchical taxonomy term.
    Term,
    /// A binary asset.
    Attachment,
}

impl EntityKind {
    /// All kinds, in a stable order.
    pub const ALL: [EntityKind; 3] = [Self::Post, Self::Term, Self::Attachment];

    /// The kind tag used in wire payloads and metadata namespaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Term => "term",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "term" => Ok(Self::Term),
            "attachment" => Ok(Self::Attachment),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// A tagged reference to a local entity.
///
/// The variant fixes the identifier space once at ingestion; there is no
/// shape-sniffing downstream. Identifiers are unique per kind, not globally.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
    Post(u64),
    Term(u64),
    #[serde(rename = "attachment")]
    Asset(u64),
}

impl EntityRef {
    /// The local identifier within this entity's kind.
    pub fn id(&self) -> u64 {
        match self {
            Self::Post(id) | Self::Term(id) | Self::Asset(id) => *id,
        }
    }

    /// The kind tag of this entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Post(_) => EntityKind::Post,
            Self::Term(_) => EntityKind::Term,
            Self::Asset(_) => EntityKind::Attachment,
        }
    }

    /// Construct a reference from a kind tag and a local identifier.
    pub fn new(kind: EntityKind, id: u64) -> Self {
        match kind {
            EntityKind::Post => Self::Post(id),
            EntityKind::Term => Self::Term(id),
            EntityKind::Attachment => Self::Asset(id),
        }
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Origin information attached to outbound payload meta, linking a replica
/// back to its source entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub object_id: u64,
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl SourceInfo {
    /// Source info for a local entity, without an origin URL.
    pub fn new(entity: EntityRef) -> Self {
        Self {
            object_id: entity.id(),
            kind: entity.kind(),
            origin: None,
        }
    }

    /// Attach the origin base URL.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The entity this source info points at.
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.kind, self.object_id)
    }
}
