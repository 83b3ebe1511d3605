//! # JKS Binary Format
//!
//! This module reads and writes the Java KeyStore binary format, restricted to
//! trusted certificate entries.
//!
//! ## Layout
//!
//! All integers are big-endian:
//! - Header: magic `0xFEEDFEED` (u32), version (u32), entry count (u32)
//! - Per entry: tag `2` (u32), alias (u16 length + UTF-8), creation time in
//!   milliseconds since the epoch (i64), certificate type (u16 length +
//!   `X.509`, version 2 only), certificate length (u32), DER bytes
//! - Seal: SHA-1 of the password as UTF-16BE, the whitener `Mighty Aphrodite`
//!   and every preceding byte, appended as 20 raw bytes
//!
//! Stores with an empty password are written without the seal. Java loads
//! those when no password is given, skipping verification.

use std::io::Write;

use chrono::DateTime;
use sha1::{Digest, Sha1};

use crate::certificate::ParsedCertificate;
use crate::common::{
    TrustStoreError, TrustStoreResult, CERTIFICATE_TYPE, DIGEST_LENGTH, DIGEST_WHITENER, JKS_MAGIC,
    JKS_VERSION_1, JKS_VERSION_2, PRIVATE_KEY_TAG, TRUSTED_CERTIFICATE_TAG,
};
use crate::trust_store::{TrustStore, TrustedEntry};

/// Encodes `store` into a fresh buffer.
pub fn encode(store: &TrustStore) -> TrustStoreResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_to(store, &mut buffer)?;
    Ok(buffer)
}

/// Writes `store` to `writer`, sealing it when the store has a password.
///
/// # Errors
///
/// Returns `TrustStoreError::Serialization` if the writer fails or a field
/// does not fit its length prefix.
pub fn write_to<W: Write>(store: &TrustStore, writer: W) -> TrustStoreResult<()> {
    let mut encoder = Encoder::new(writer, store.password());
    encoder.write_u32(JKS_MAGIC)?;
    encoder.write_u32(JKS_VERSION_2)?;
    encoder.write_u32(length_prefix(store.len(), "entry count")?)?;
    for entry in store.entries() {
        encoder.write_trusted_entry(entry)?;
    }
    if store.is_sealed() {
        encoder.write_seal()?;
    }
    encoder.flush()
}

/// Decodes a store, verifying its seal when `password` is non-empty.
///
/// # Errors
///
/// Returns `TrustStoreError::MalformedStore` on structural problems and
/// `TrustStoreError::IntegrityCheck` when the seal is missing or does not
/// match `password`.
pub fn decode(bytes: &[u8], password: &str) -> TrustStoreResult<TrustStore> {
    let mut decoder = Decoder { bytes, offset: 0 };
    if decoder.read_u32()? != JKS_MAGIC {
        return Err(TrustStoreError::MalformedStore("invalid magic".into()));
    }
    let version = decoder.read_u32()?;
    if version != JKS_VERSION_1 && version != JKS_VERSION_2 {
        return Err(TrustStoreError::MalformedStore(format!(
            "unsupported version {version}"
        )));
    }
    let count = decoder.read_u32()?;
    let mut entries = Vec::new();
    for position in 0..count as usize {
        entries.push(decoder.read_entry(version, position)?);
    }

    let (content, trailer) = bytes.split_at(decoder.offset);
    match trailer.len() {
        0 if password.is_empty() => {}
        0 => return Err(TrustStoreError::IntegrityCheck),
        DIGEST_LENGTH => {
            if !password.is_empty() && seal(password, content).as_slice() != trailer {
                return Err(TrustStoreError::IntegrityCheck);
            }
        }
        other => {
            return Err(TrustStoreError::MalformedStore(format!(
                "{other} unexpected trailing bytes"
            )));
        }
    }
    log::debug!("Decoded trust store with {} entries", entries.len());
    Ok(TrustStore::from_entries(entries, password))
}

fn password_bytes(password: &str) -> Vec<u8> {
    password
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect()
}

fn keyed_digest(password: &str) -> Sha1 {
    let mut digest = Sha1::new();
    digest.update(password_bytes(password));
    digest.update(DIGEST_WHITENER);
    digest
}

fn seal(password: &str, content: &[u8]) -> Vec<u8> {
    let mut digest = keyed_digest(password);
    digest.update(content);
    digest.finalize().to_vec()
}

fn length_prefix<T: TryFrom<usize>>(length: usize, field: &str) -> TrustStoreResult<T> {
    T::try_from(length)
        .map_err(|_| TrustStoreError::Serialization(format!("{field} too long: {length}")))
}

/// Writer that feeds every byte into the running integrity digest
struct Encoder<W: Write> {
    writer: W,
    digest: Sha1,
}

impl<W: Write> Encoder<W> {
    fn new(writer: W, password: &str) -> Self {
        Self {
            writer,
            digest: keyed_digest(password),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TrustStoreResult<()> {
        self.digest.update(bytes);
        self.writer
            .write_all(bytes)
            .map_err(|e| TrustStoreError::Serialization(e.to_string()))
    }

    fn write_u16(&mut self, value: u16) -> TrustStoreResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_u32(&mut self, value: u32) -> TrustStoreResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> TrustStoreResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_str(&mut self, value: &str) -> TrustStoreResult<()> {
        self.write_u16(length_prefix(value.len(), "string")?)?;
        self.write_bytes(value.as_bytes())
    }

    fn write_trusted_entry(&mut self, entry: &TrustedEntry) -> TrustStoreResult<()> {
        log::debug!("Writing trusted entry {}", entry.alias);
        self.write_u32(TRUSTED_CERTIFICATE_TAG)?;
        self.write_str(&entry.alias)?;
        self.write_i64(entry.created_at.timestamp_millis())?;
        self.write_str(CERTIFICATE_TYPE)?;
        let der = &entry.certificate.der;
        self.write_u32(length_prefix(der.len(), "certificate")?)?;
        self.write_bytes(der)
    }

    fn write_seal(&mut self) -> TrustStoreResult<()> {
        let seal = self.digest.clone().finalize();
        self.writer
            .write_all(&seal)
            .map_err(|e| TrustStoreError::Serialization(e.to_string()))
    }

    fn flush(&mut self) -> TrustStoreResult<()> {
        self.writer
            .flush()
            .map_err(|e| TrustStoreError::Serialization(e.to_string()))
    }
}

struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    fn read_bytes(&mut self, length: usize) -> TrustStoreResult<&'a [u8]> {
        let bytes = self.bytes;
        let end = self
            .offset
            .checked_add(length)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                TrustStoreError::MalformedStore(format!("truncated at byte {}", self.offset))
            })?;
        let slice = &bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> TrustStoreResult<[u8; N]> {
        let mut array = [0; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    fn read_u16(&mut self) -> TrustStoreResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    fn read_u32(&mut self) -> TrustStoreResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> TrustStoreResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    fn read_str(&mut self) -> TrustStoreResult<String> {
        let length = self.read_u16()? as usize;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| TrustStoreError::MalformedStore("string is not UTF-8".into()))
    }

    fn read_entry(&mut self, version: u32, position: usize) -> TrustStoreResult<TrustedEntry> {
        match self.read_u32()? {
            TRUSTED_CERTIFICATE_TAG => {}
            PRIVATE_KEY_TAG => {
                return Err(TrustStoreError::MalformedStore(
                    "private key entries are not supported".into(),
                ));
            }
            tag => {
                return Err(TrustStoreError::MalformedStore(format!(
                    "unknown entry tag {tag}"
                )));
            }
        }
        let alias = self.read_str()?;
        let millis = self.read_i64()?;
        let created_at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            TrustStoreError::MalformedStore(format!("creation time out of range: {millis}"))
        })?;
        if version == JKS_VERSION_2 {
            let certificate_type = self.read_str()?;
            if certificate_type != CERTIFICATE_TYPE {
                return Err(TrustStoreError::MalformedStore(format!(
                    "unsupported certificate type {certificate_type}"
                )));
            }
        }
        let length = self.read_u32()? as usize;
        let der = self.read_bytes(length)?.to_vec();
        Ok(TrustedEntry {
            alias,
            created_at,
            certificate: ParsedCertificate { position, der },
        })
    }
}
