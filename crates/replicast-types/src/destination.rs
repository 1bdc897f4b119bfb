use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::error::TypeError;

/// Stable identifier of a remote endpoint.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DestinationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A remote endpoint participating in replication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    /// Base URL of the destination's API, e.g. `https://remote.example/wp-json/wp/v2`.
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Entity kinds this destination accepts. Empty means all kinds.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub kinds: BTreeSet<EntityKind>,
}

impl Destination {
    /// Check the configuration before any request is built.
    ///
    /// An invalid destination is a configuration error: it fails fast and is
    /// never retried.
    pub fn validate(&self) -> Result<(), TypeError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(TypeError::InvalidDestination {
                id: self.id,
                reason: format!("base_url is not an http(s) URL: {:?}", self.base_url),
            });
        }
        if self.api_key.is_empty() {
            return Err(TypeError::InvalidDestination {
                id: self.id,
                reason: "api_key is empty".into(),
            });
        }
        if self.api_secret.is_empty() {
            return Err(TypeError::InvalidDestination {
                id: self.id,
                reason: "api_secret is empty".into(),
            });
        }
        Ok(())
    }

    /// `true` if the destination accepts entities of the given kind.
    pub fn accepts(&self, kind: EntityKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    /// The base URL without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
