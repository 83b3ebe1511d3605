//! # Trust Store Resource
//!
//! This module wraps the build pipeline in the lifecycle a provisioning tool
//! expects from a resource:
//!
//! - `create` builds the store and records `timestamp`, `jks` and `id`
//! - `read` rebuilds from the recorded timestamp, reproducing the same output
//! - `delete` forgets the identifier without computing anything
//!
//! `certificates` and `password` are fixed once created; changing either one
//! means replacing the resource, which also discards the stored timestamp.
//! The field set is persisted as JSON so rebuilds survive between runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact::{build, BuildRequest, EncodedArtifact};
use crate::certificate::CertificateChainInput;
use crate::common::{TrustStoreError, TrustStoreResult};

/// Lifecycle position of a resource
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Uninitialized,
    Created,
    Deleted,
}

/// Persisted fields of a trust store resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    pub certificates: Vec<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// JKS trust store data, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jks: Option<String>,
}

impl ResourceData {
    pub fn new(certificates: Vec<String>, password: &str) -> Self {
        Self {
            certificates,
            password: password.to_string(),
            ..Default::default()
        }
    }

    /// Builds the resource from the untyped certificate list of a host
    /// configuration, validating it on the way in.
    pub fn from_values(
        certificates: &[serde_json::Value],
        password: &str,
    ) -> TrustStoreResult<Self> {
        let input = CertificateChainInput::try_from(certificates)?;
        Ok(Self::new(input.chains().to_vec(), password))
    }

    pub fn state(&self) -> ResourceState {
        match (&self.id, &self.jks) {
            (Some(_), _) => ResourceState::Created,
            (None, Some(_)) => ResourceState::Deleted,
            (None, None) => ResourceState::Uninitialized,
        }
    }

    /// Builds the trust store and commits the computed fields.
    ///
    /// Nothing is committed when the build fails.
    pub fn create(&mut self) -> TrustStoreResult<&str> {
        let artifact = build(&BuildRequest {
            certificates: self.certificates.clone(),
            password: self.password.clone(),
            timestamp: self.timestamp.clone(),
        })?;
        self.commit(artifact);
        Ok(self.id.as_deref().unwrap_or_default())
    }

    /// Rebuilds from the recorded timestamp.
    pub fn read(&mut self) -> TrustStoreResult<&str> {
        self.create()
    }

    pub fn delete(&mut self) {
        log::info!("Deleting trust store {}", self.id.as_deref().unwrap_or("-"));
        self.id = None;
    }

    /// Whether moving to the given configuration needs a fresh resource.
    pub fn requires_replacement(&self, certificates: &[String], password: &str) -> bool {
        self.certificates != certificates || self.password != password
    }

    /// Returns the resource to use for the given configuration: this one when
    /// nothing changed, otherwise a fresh one with no timestamp.
    pub fn replace(self, certificates: Vec<String>, password: &str) -> Self {
        if self.requires_replacement(&certificates, password) {
            log::info!("Configuration changed, replacing trust store");
            Self::new(certificates, password)
        } else {
            self
        }
    }

    /// Decoded JKS bytes of the last successful build.
    ///
    /// # Errors
    ///
    /// Returns `TrustStoreError::NotCreated` unless the resource is created.
    pub fn jks_bytes(&self) -> TrustStoreResult<Vec<u8>> {
        match (self.state(), self.jks.as_deref()) {
            (ResourceState::Created, Some(jks)) => EncodedArtifact::decode_base64(jks),
            _ => Err(TrustStoreError::NotCreated),
        }
    }

    pub fn load(path: &Path) -> TrustStoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the fields to `path`.
    ///
    /// # Errors
    ///
    /// Returns `TrustStoreError::Persist` if the state cannot be serialized or written.
    pub fn save(&self, path: &Path) -> TrustStoreResult<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TrustStoreError::Persist(e.to_string()))?;
        fs::write(path, contents)
            .map_err(|e| TrustStoreError::Persist(format!("{}: {}", path.display(), e)))
    }

    fn commit(&mut self, artifact: EncodedArtifact) {
        self.timestamp = Some(artifact.timestamp);
        self.jks = Some(artifact.base64);
        self.id = Some(artifact.id);
    }
}
