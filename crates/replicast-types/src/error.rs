use thiserror::Error;

use crate::destination::DestinationId;

/// Errors from foundation type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The kind tag is not one of `post`, `term`, `attachment`.
    #[error("unknown entity kind: {0:?}")]
    UnknownKind(String),

    /// The destination configuration is invalid or incomplete.
    #[error("destination {id} is not valid: {reason}")]
    InvalidDestination { id: DestinationId, reason: String },
}
