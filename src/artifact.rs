//! # Build Pipeline
//!
//! This module strings the stages together. The flow is strictly linear:
//!
//! 1. Validate the chain list at the boundary (non-empty)
//! 2. Resolve the creation timestamp
//! 3. Decode PEM blocks into certificates
//! 4. Assemble the trust store
//! 5. Encode it as JKS, then as base64 text
//! 6. Derive the identifier from that text
//!
//! Nothing is retained between builds; the same request with the same
//! timestamp always yields byte-identical output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::certificate::{decode_chains, CertificateChainInput};
use crate::common::{TrustStoreError, TrustStoreResult};
use crate::identity::compute_id;
use crate::jks;
use crate::trust_store::{Timestamp, TrustStore};

/// Everything a build depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub certificates: Vec<String>,
    pub password: String,
    /// Timestamp returned by a previous build, in RFC3339.
    pub timestamp: Option<String>,
}

/// The encoded trust store and the values derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub base64: String,
    pub id: String,
    /// Timestamp to persist for reproducible rebuilds.
    pub timestamp: String,
}

impl EncodedArtifact {
    /// Decodes the base64 text of a stored artifact back into JKS bytes.
    pub fn decode_base64(text: &str) -> TrustStoreResult<Vec<u8>> {
        STANDARD
            .decode(text)
            .map_err(|e| TrustStoreError::MalformedStore(format!("invalid base64: {e}")))
    }
}

/// Runs the whole pipeline for one request.
///
/// # Errors
///
/// Returns `TrustStoreError::EmptyInput` before anything else when no chain is
/// supplied, then any decoding or serialization error of the later stages.
pub fn build(request: &BuildRequest) -> TrustStoreResult<EncodedArtifact> {
    let input = CertificateChainInput::new(request.certificates.clone())?;
    let timestamp = Timestamp::resolve(request.timestamp.as_deref());
    build_with(&input, &request.password, &timestamp)
}

/// Runs the pipeline against an already validated input and timestamp.
pub fn build_with(
    input: &CertificateChainInput,
    password: &str,
    timestamp: &Timestamp,
) -> TrustStoreResult<EncodedArtifact> {
    let certificates = decode_chains(input)?;
    let store = TrustStore::build(certificates, timestamp.value, password)?;
    let bytes = jks::encode(&store)?;
    let base64 = STANDARD.encode(&bytes);
    let id = compute_id(&base64);
    log::info!(
        "Built trust store {id} with {} entries ({} bytes)",
        store.len(),
        bytes.len()
    );
    Ok(EncodedArtifact {
        bytes,
        base64,
        id,
        timestamp: timestamp.text.clone(),
    })
}
