use md5::Md5;
use serde::Serialize;
use sha2::{Digest, Sha256, Sha512};

/// The hash algorithm a destination pair has agreed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Md5,
}

impl SignatureAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
        }
    }
}

/// A hex-encoded request signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", &self.0[..8.min(self.0.len())])
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("canonical serialization failed: {0}")]
    Canonicalization(String),
}

/// The canonical structure under the digest.
///
/// Field order is fixed and part of the wire contract; serialization is
/// compact JSON with no whitespace.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    api_key: &'a str,
    method: &'a str,
    request_body_marker: [&'a str; 0],
    uri: &'a str,
    timestamp: i64,
}

/// Computes request signatures from a destination's credentials.
///
/// Signing is deterministic and pure: a failure indicates bad input, not a
/// transient condition, and is never retried.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    secret: String,
    algorithm: SignatureAlgorithm,
}

impl RequestSigner {
    /// A signer using the default algorithm (SHA-256).
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            algorithm: SignatureAlgorithm::default(),
        }
    }

    /// Select a non-default hash algorithm.
    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign a request.
    ///
    /// `uri` is the full canonical request URI including any query string.
    /// The digest input is the compact JSON encoding of
    /// `{"api_key":…,"method":…,"request_body_marker":[],"uri":…,"timestamp":…}`
    /// concatenated with the shared secret.
    pub fn sign(&self, method: &str, uri: &str, timestamp: i64) -> Result<Signature, SignerError> {
        let canonical = CanonicalRequest {
            api_key: &self.api_key,
            method,
            request_body_marker: [],
            uri,
            timestamp,
        };
        let mut input = serde_json::to_string(&canonical)
            .map_err(|e| SignerError::Canonicalization(e.to_string()))?;
        input.push_str(&self.secret);

        let hex = match self.algorithm {
            SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
            SignatureAlgorithm::Sha512 => hex::encode(Sha512::digest(input.as_bytes())),
            SignatureAlgorithm::Md5 => hex::encode(Md5::digest(input.as_bytes())),
        };
        Ok(Signature(hex))
    }

    /// Check a signature received from a peer against the shared secret.
    pub fn verify(
        &self,
        method: &str,
        uri: &str,
        timestamp: i64,
        signature: &str,
    ) -> Result<bool, SignerError> {
        let expected = self.sign(method, uri, timestamp)?;
        Ok(expected.as_str() == signature)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
