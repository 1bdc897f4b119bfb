use replicast_protocol::ProtocolError;
use replicast_store::StoreError;
use replicast_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed registry configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Destination(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type SyncResult<T> = Result<T, SyncError>;
