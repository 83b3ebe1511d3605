//! # Trust Store Assembly
//!
//! This module assembles decoded certificates into an in-memory trust store.
//! Every certificate becomes a trusted entry whose alias is its zero-based
//! global position, and all entries share one creation time.
//!
//! ## Timestamp Policy
//!
//! The creation time is the anchor that makes rebuilds reproducible:
//! - A previously stored RFC3339 timestamp is parsed and reused verbatim
//! - A missing or unparsable one is replaced by the current time, truncated
//!   to whole seconds in UTC, and handed back for the caller to persist

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::certificate::ParsedCertificate;
use crate::common::{TrustStoreError, TrustStoreResult};

/// The creation time shared by all entries of a build, along with the text
/// the caller should persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub value: DateTime<Utc>,
    pub text: String,
    /// Whether the value was freshly generated instead of reused.
    pub generated: bool,
}

impl Timestamp {
    /// Reuses `stored` when it is valid RFC3339, otherwise generates `now`.
    pub fn resolve(stored: Option<&str>) -> Self {
        Self::resolve_at(stored, Utc::now())
    }

    fn resolve_at(stored: Option<&str>, now: DateTime<Utc>) -> Self {
        if let Some(text) = stored {
            match DateTime::parse_from_rfc3339(text) {
                Ok(value) => {
                    log::info!("Reusing stored timestamp {text}");
                    return Self {
                        value: value.with_timezone(&Utc),
                        text: text.to_string(),
                        generated: false,
                    };
                }
                Err(e) => log::warn!("Ignoring unparsable timestamp {text:?}: {e}"),
            }
        }
        let value = now.trunc_subsecs(0);
        let text = value.to_rfc3339_opts(SecondsFormat::Secs, true);
        log::info!("Generated timestamp {text}");
        Self {
            value,
            text,
            generated: true,
        }
    }
}

/// A certificate trusted under a given alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedEntry {
    pub alias: String,
    pub created_at: DateTime<Utc>,
    pub certificate: ParsedCertificate,
}

/// Ordered set of trusted entries plus the password sealing their encoding.
///
/// A store is rebuilt from scratch on every invocation; entries keep the order
/// in which they were supplied.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustStore {
    entries: Vec<TrustedEntry>,
    password: String,
}

impl TrustStore {
    /// Builds a store with one entry per certificate, aliased by position.
    ///
    /// # Errors
    ///
    /// Returns `TrustStoreError::EmptyInput` if `certificates` is empty.
    pub fn build(
        certificates: Vec<ParsedCertificate>,
        created_at: DateTime<Utc>,
        password: &str,
    ) -> TrustStoreResult<Self> {
        if certificates.is_empty() {
            return Err(TrustStoreError::EmptyInput);
        }
        let entries = certificates
            .into_iter()
            .enumerate()
            .map(|(index, certificate)| TrustedEntry {
                alias: index.to_string(),
                created_at,
                certificate,
            })
            .collect::<Vec<_>>();
        log::debug!("Assembled trust store with {} entries", entries.len());
        Ok(Self {
            entries,
            password: password.to_string(),
        })
    }

    /// Wraps entries read back from an encoded store.
    pub(crate) fn from_entries(entries: Vec<TrustedEntry>, password: &str) -> Self {
        Self {
            entries,
            password: password.to_string(),
        }
    }

    pub fn entries(&self) -> &[TrustedEntry] {
        &self.entries
    }

    pub fn get(&self, alias: &str) -> Option<&TrustedEntry> {
        self.entries.iter().find(|entry| entry.alias == alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// An empty password means the encoding carries no integrity seal.
    pub fn is_sealed(&self) -> bool {
        !self.password.is_empty()
    }
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("entries", &self.entries)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
