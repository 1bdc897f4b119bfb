use std::collections::HashMap;

use replicast_types::{Destination, DestinationId};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// The configured destinations, keyed by id.
///
/// A destination's id doubles as the term id of its entry in the
/// destination taxonomy: assigning that term to an entity targets the
/// destination.
#[derive(Clone, Debug, Default)]
pub struct DestinationRegistry {
    destinations: HashMap<DestinationId, Destination>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a destination.
    pub fn register(&mut self, destination: Destination) {
        self.destinations.insert(destination.id, destination);
    }

    pub fn get(&self, id: DestinationId) -> Option<&Destination> {
        self.destinations.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = DestinationId> + '_ {
        self.destinations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

/// On-disk registry configuration.
///
/// ```toml
/// [[destinations]]
/// id = 1
/// base_url = "https://remote.example/wp-json/wp/v2"
/// api_key = "…"
/// api_secret = "…"
/// kinds = ["post", "attachment"]
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

impl RegistryConfig {
    pub fn from_toml(input: &str) -> SyncResult<Self> {
        toml::from_str(input).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Validate every destination and build the registry.
    ///
    /// Fails fast on the first invalid or duplicated entry; a broken
    /// config never reaches request building.
    pub fn into_registry(self) -> SyncResult<DestinationRegistry> {
        let mut registry = DestinationRegistry::new();
        for destination in self.destinations {
            destination.validate()?;
            if registry.get(destination.id).is_some() {
                return Err(SyncError::Config(format!(
                    "duplicate destination id {}",
                    destination.id
                )));
            }
            registry.register(destination);
        }
        Ok(registry)
    }
}
