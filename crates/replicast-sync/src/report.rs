use replicast_types::{DestinationId, EntityRef};

/// The event a destination outcome belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    Save,
    Trash,
    Delete,
    /// A hard delete issued because the destination was dropped from the
    /// entity's target set.
    Reconcile,
}

/// What a successful per-destination operation did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Created { remote_id: u64 },
    Updated { remote_id: u64 },
    Trashed,
    Deleted,
    /// Nothing to do: no replica existed, or the destination does not
    /// accept this entity kind.
    Skipped,
}

/// The independently captured result for one destination.
#[derive(Clone, Debug)]
pub struct DestinationOutcome {
    pub destination: DestinationId,
    pub action: SyncAction,
    /// Success variant, or the failure message for reporting.
    pub result: Result<SyncOutcome, String>,
}

impl DestinationOutcome {
    pub fn ok(destination: DestinationId, action: SyncAction, outcome: SyncOutcome) -> Self {
        Self {
            destination,
            action,
            result: Ok(outcome),
        }
    }

    pub fn failed(
        destination: DestinationId,
        action: SyncAction,
        message: impl std::fmt::Display,
    ) -> Self {
        Self {
            destination,
            action,
            result: Err(message.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregated per-destination status for one event.
///
/// A multi-destination operation never collapses into a single opaque
/// failure; each destination's outcome is reported on its own.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub entity: EntityRef,
    pub outcomes: Vec<DestinationOutcome>,
}

impl SyncReport {
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            outcomes: Vec::new(),
        }
    }

    /// `true` when every destination succeeded (or there was nothing to do).
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(DestinationOutcome::is_ok)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// The outcome recorded for one destination and action, if any.
    pub fn outcome(
        &self,
        destination: DestinationId,
        action: SyncAction,
    ) -> Option<&DestinationOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.destination == destination && o.action == action)
    }
}
