//! # Common Types and Constants
//!
//! This module provides the types shared by every stage of the trust store
//! pipeline. It includes:
//! - The crate-wide error enum and result alias
//! - Constants describing the JKS binary layout
//! - Constants for the persisted field names

/// Magic number opening every JKS file.
pub const JKS_MAGIC: u32 = 0xFEED_FEED;
/// Original JKS version, entries carry no certificate type.
pub const JKS_VERSION_1: u32 = 1;
/// Current JKS version, the one this crate writes.
pub const JKS_VERSION_2: u32 = 2;
/// Entry tag of a private key entry.
pub const PRIVATE_KEY_TAG: u32 = 1;
/// Entry tag of a trusted certificate entry.
pub const TRUSTED_CERTIFICATE_TAG: u32 = 2;
/// Certificate type written before every certificate.
pub const CERTIFICATE_TYPE: &str = "X.509";
/// Salt mixed into the integrity digest after the password.
pub const DIGEST_WHITENER: &[u8] = b"Mighty Aphrodite";
/// Length of the trailing SHA-1 integrity digest.
pub const DIGEST_LENGTH: usize = 20;
/// PEM label accepted for certificate blocks.
pub const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

pub type TrustStoreResult<R> = Result<R, TrustStoreError>;

/// Represents errors that can occur while building or reading a trust store
///
/// The set is closed: every failure of the pipeline maps onto one of these
/// variants, and none of them leaves partial output behind.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TrustStoreError {
    #[error("No certificates supplied")]
    EmptyInput,
    #[error("Invalid PEM content: {0}")]
    Decode(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Malformed trust store: {0}")]
    MalformedStore(String),
    #[error("Trust store was tampered with, or password was incorrect")]
    IntegrityCheck,
    #[error("Trust store resource has not been created")]
    NotCreated,
    #[error("Failed to persist resource state: {0}")]
    Persist(String),
    #[error("IO error: {0}")]
    IO(String),
}

impl From<std::io::Error> for TrustStoreError {
    fn from(e: std::io::Error) -> Self {
        TrustStoreError::IO(format!("{:?}", e))
    }
}

impl From<serde_json::Error> for TrustStoreError {
    fn from(e: serde_json::Error) -> Self {
        TrustStoreError::IO(format!("{:?}", e))
    }
}

impl From<pem::PemError> for TrustStoreError {
    fn from(e: pem::PemError) -> Self {
        TrustStoreError::Decode(e.to_string())
    }
}
