use replicast_crypto::SignerError;
use replicast_store::StoreError;
use replicast_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Invalid or incomplete destination configuration. Failed fast before
    /// any request was built; never retried.
    #[error(transparent)]
    Config(#[from] TypeError),

    /// A caller bug: the request cannot be expressed at all (e.g. updating
    /// a never-created entity).
    #[error("contract violation: {0}")]
    Contract(String),

    /// The destination answered with a non-2xx status.
    #[error("remote error: status {status}: {reason}")]
    Remote { status: u16, reason: String },

    /// The request never completed (network failure, scripted gap).
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload or response could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The referenced asset has no stored content.
    #[error("asset {0} has no stored content")]
    MissingAsset(u64),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("signing error: {0}")]
    Signing(#[from] SignerError),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
