//! Request signing for the Replicast key-auth contract.
//!
//! The signature is a cross-language compatibility surface: every
//! implementation, in any language, must produce byte-identical output for
//! identical input. See [`RequestSigner::sign`] for the canonical form.

pub mod signer;

pub use signer::{RequestSigner, Signature, SignatureAlgorithm, SignerError};
