use replicast_types::EntityRef;
use thiserror::Error;

/// Errors from host storage collaborators.
///
/// Storage I/O failure is surfaced to the caller, never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist in the host store.
    #[error("entity not found: {0}")]
    NotFound(EntityRef),

    /// I/O failure in the underlying storage substrate.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
