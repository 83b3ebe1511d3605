//! # Certificate Decoding
//!
//! This module turns the caller's PEM text into raw DER certificates. Each
//! input string may hold several concatenated `CERTIFICATE` blocks; they are
//! decoded left to right and numbered by their position in the flattened
//! sequence across all strings.

use hex::ToHex;
use sha1::{Digest, Sha1};
use x509_certificate::X509Certificate;

use crate::common::{TrustStoreError, TrustStoreResult, PEM_CERTIFICATE_LABEL};

/// Ordered, non-empty list of PEM encoded certificate chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChainInput {
    chains: Vec<String>,
}

impl CertificateChainInput {
    pub fn new(chains: Vec<String>) -> TrustStoreResult<Self> {
        if chains.is_empty() {
            return Err(TrustStoreError::EmptyInput);
        }
        Ok(Self { chains })
    }

    pub fn chains(&self) -> &[String] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Accepts the untyped list a provisioning host hands over, rejecting
/// anything that is not a string.
impl<'a> TryFrom<&'a [serde_json::Value]> for CertificateChainInput {
    type Error = TrustStoreError;

    fn try_from(values: &'a [serde_json::Value]) -> Result<Self, Self::Error> {
        let chains = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value.as_str().map(String::from).ok_or_else(|| {
                    TrustStoreError::InvalidInput(format!("certificate {index} is not a string"))
                })
            })
            .collect::<TrustStoreResult<Vec<_>>>()?;
        Self::new(chains)
    }
}

/// Raw DER bytes of one certificate, tagged with its global position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    pub position: usize,
    pub der: Vec<u8>,
}

impl ParsedCertificate {
    /// Uppercase, colon separated SHA-1 fingerprint, as keytool prints it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha1::digest(&self.der);
        let hex: String = digest.encode_hex_upper();
        hex.as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Subject common name, when the bytes are a parseable X.509 certificate.
    ///
    /// Contents are never validated while building a store, so this returns
    /// `None` rather than failing on opaque bytes.
    pub fn subject_common_name(&self) -> Option<String> {
        X509Certificate::from_der(&self.der)
            .ok()
            .and_then(|certificate| certificate.subject_common_name())
    }
}

/// Decodes every chain in order, numbering certificates across chains.
///
/// # Errors
///
/// Returns `TrustStoreError::Decode` if a chain holds no PEM block, a block is
/// malformed, or a block carries a label other than `CERTIFICATE`.
pub fn decode_chains(input: &CertificateChainInput) -> TrustStoreResult<Vec<ParsedCertificate>> {
    let mut certificates = Vec::new();
    for (chain_index, chain) in input.chains().iter().enumerate() {
        let blocks = decode_chain(chain).map_err(|e| match e {
            TrustStoreError::Decode(reason) => {
                TrustStoreError::Decode(format!("chain {chain_index}: {reason}"))
            }
            other => other,
        })?;
        log::debug!("Chain {chain_index} holds {} certificate(s)", blocks.len());
        for der in blocks {
            certificates.push(ParsedCertificate {
                position: certificates.len(),
                der,
            });
        }
    }
    Ok(certificates)
}

fn decode_chain(chain: &str) -> TrustStoreResult<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(chain)?;
    if blocks.is_empty() {
        return Err(TrustStoreError::Decode("no PEM block found".into()));
    }
    blocks
        .into_iter()
        .map(|block| {
            if block.tag() != PEM_CERTIFICATE_LABEL {
                return Err(TrustStoreError::Decode(format!(
                    "unexpected PEM block type {}",
                    block.tag()
                )));
            }
            if block.contents().is_empty() {
                return Err(TrustStoreError::Decode("empty certificate block".into()));
            }
            Ok(block.into_contents())
        })
        .collect()
}
