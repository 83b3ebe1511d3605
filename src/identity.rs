//! # Artifact Identity
//!
//! The external identifier of an artifact is the lowercase hex SHA-1 of its
//! base64 text. It changes whenever the certificates, their order, the
//! password or the anchoring timestamp change.

use hex::ToHex;
use sha1::{Digest, Sha1};

/// Computes the 40 character identifier of a base64 encoded artifact.
pub fn compute_id(artifact_base64: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(artifact_base64.as_bytes());
    let hash = &hasher.finalize()[..];
    hash.encode_hex()
}
