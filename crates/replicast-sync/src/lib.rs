//! Per-event sync orchestration.
//!
//! For every content save/trash/delete event the [`SyncOrchestrator`]
//! selects the targeted destinations, primes dependent assets, drives the
//! protocol handlers, persists nested descriptors from the responses, and
//! reconciles destination membership against the Identity Map.
//!
//! Destination failures are isolated: one destination's failure never
//! aborts the others, and every outcome lands in the [`SyncReport`].

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod report;

pub use error::{SyncError, SyncResult};
pub use orchestrator::SyncOrchestrator;
pub use registry::{DestinationRegistry, RegistryConfig};
pub use report::{DestinationOutcome, SyncAction, SyncOutcome, SyncReport};
