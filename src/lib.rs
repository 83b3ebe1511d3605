//! # truststore
//!
//! Converts PEM encoded certificate chains into a JKS trust store, together
//! with a content identifier that stays stable across rebuilds.
//!
//! ```no_run
//! use truststore::artifact::{build, BuildRequest};
//!
//! let artifact = build(&BuildRequest {
//!     certificates: vec![std::fs::read_to_string("ca.pem").unwrap()],
//!     password: "changeit".into(),
//!     timestamp: None,
//! })
//! .unwrap();
//! println!("{} {}", artifact.id, artifact.timestamp);
//! ```

pub mod artifact;
pub mod certificate;
pub mod common;
pub mod identity;
pub mod jks;
pub mod resource;
pub mod trust_store;
