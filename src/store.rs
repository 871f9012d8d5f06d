//! The versioned object store boundary.
//!
//! The serving core does not own persistence; it relies on an external store
//! that can write a named payload together with a metadata envelope, read
//! both back by version, and list versions. [`ObjectStore`] is that minimal
//! contract, and [`MemoryStore`] is an in-process implementation used by the
//! tests and by callers who want a throwaway board.
//!
//! Selecting which version is "current" when none is requested is the
//! store's policy, not the core's; [`ObjectStore::resolve_version`] is where
//! an implementation applies it. [`MemoryStore`] resolves to the most
//! recently written version.

use crate::error::{PlinthError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Structured model metadata stored alongside a payload.
///
/// Absent on records written before this envelope existed; reconstruction
/// coerces those into structured [`Metadata`] on first access.
///
/// [`Metadata`]: crate::meta::Metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetaEnvelope {
    /// Packages needed to reproduce predictions.
    #[serde(default)]
    pub required_pkgs: Vec<String>,
    /// Serialized prototype schema document, if the record had one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prototype: Option<Value>,
    /// Runtime tag captured at original creation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub runtime_tag: Option<String>,
}

/// Side metadata written with every model payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEnvelope {
    /// Human description of the stored model.
    pub description: String,
    /// Opaque user-supplied details.
    #[serde(default)]
    pub user: Map<String, Value>,
    /// Handler family that encoded the payload; reconstruction dispatches
    /// the decoder on this.
    pub family: String,
    /// Structured model metadata; `None` on legacy records.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<ModelMetaEnvelope>,
}

/// One version of a stored key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
    pub created: DateTime<Utc>,
}

/// Minimal contract the serving core requires from a versioned store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a payload and its envelope, returning the assigned version id.
    async fn write(&self, key: &str, payload: &[u8], envelope: &StoreEnvelope)
        -> Result<String>;

    /// Read a payload at a version.
    async fn read(&self, key: &str, version: &str) -> Result<Vec<u8>>;

    /// Read the envelope at a version.
    async fn read_envelope(&self, key: &str, version: &str) -> Result<StoreEnvelope>;

    /// Apply the store's currency policy: map an optional requested version
    /// to a concrete one.
    async fn resolve_version(&self, key: &str, version: Option<&str>) -> Result<String>;

    /// List versions of a key, oldest first.
    async fn list_versions(&self, key: &str) -> Result<Vec<VersionRecord>>;
}

#[derive(Debug, Clone)]
struct StoredVersion {
    version: String,
    created: DateTime<Utc>,
    payload: Vec<u8>,
    envelope: StoreEnvelope,
}

/// In-memory versioned store.
#[derive(Default)]
pub struct MemoryStore {
    keys: RwLock<HashMap<String, Vec<StoredVersion>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, key: &str, version: &str) -> Result<StoredVersion> {
        let keys = self.keys.read().await;
        let versions = keys
            .get(key)
            .ok_or_else(|| PlinthError::KeyNotFound(key.to_string()))?;
        versions
            .iter()
            .find(|v| v.version == version)
            .cloned()
            .ok_or_else(|| PlinthError::VersionNotFound {
                key: key.to_string(),
                version: version.to_string(),
            })
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn write(&self, key: &str, payload: &[u8], envelope: &StoreEnvelope)
        -> Result<String> {
        let version = uuid::Uuid::new_v4().simple().to_string();
        let mut keys = self.keys.write().await;
        keys.entry(key.to_string()).or_default().push(StoredVersion {
            version: version.clone(),
            created: Utc::now(),
            payload: payload.to_vec(),
            envelope: envelope.clone(),
        });

        debug!(key, version = %version, bytes = payload.len(), "stored model version");
        Ok(version)
    }

    async fn read(&self, key: &str, version: &str) -> Result<Vec<u8>> {
        Ok(self.lookup(key, version).await?.payload)
    }

    async fn read_envelope(&self, key: &str, version: &str) -> Result<StoreEnvelope> {
        Ok(self.lookup(key, version).await?.envelope)
    }

    async fn resolve_version(&self, key: &str, version: Option<&str>) -> Result<String> {
        if let Some(version) = version {
            // A requested version must already exist.
            self.lookup(key, version).await?;
            return Ok(version.to_string());
        }

        let keys = self.keys.read().await;
        let versions = keys
            .get(key)
            .ok_or_else(|| PlinthError::KeyNotFound(key.to_string()))?;
        versions
            .last()
            .map(|v| v.version.clone())
            .ok_or_else(|| PlinthError::KeyNotFound(key.to_string()))
    }

    async fn list_versions(&self, key: &str) -> Result<Vec<VersionRecord>> {
        let keys = self.keys.read().await;
        let versions = keys
            .get(key)
            .ok_or_else(|| PlinthError::KeyNotFound(key.to_string()))?;
        Ok(versions
            .iter()
            .map(|v| VersionRecord {
                version: v.version.clone(),
                created: v.created,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(description: &str) -> StoreEnvelope {
        StoreEnvelope {
            description: description.to_string(),
            user: Map::new(),
            family: "constant".to_string(),
            meta: None,
        }
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let store = MemoryStore::new();
        let version = store
            .write("m", b"payload", &envelope("a model"))
            .await
            .unwrap();

        let payload = store.read("m", &version).await.unwrap();
        assert_eq!(payload, b"payload");

        let env = store.read_envelope("m", &version).await.unwrap();
        assert_eq!(env.description, "a model");
    }

    #[tokio::test]
    async fn test_resolve_version_picks_latest() {
        let store = MemoryStore::new();
        store.write("m", b"v1", &envelope("one")).await.unwrap();
        let second = store.write("m", b"v2", &envelope("two")).await.unwrap();

        let resolved = store.resolve_version("m", None).await.unwrap();
        assert_eq!(resolved, second);
    }

    #[tokio::test]
    async fn test_list_versions_in_creation_order() {
        let store = MemoryStore::new();
        let first = store.write("m", b"1", &envelope("one")).await.unwrap();
        let second = store.write("m", b"2", &envelope("two")).await.unwrap();

        let versions = store.list_versions("m").await.unwrap();
        let ids: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    }

    #[tokio::test]
    async fn test_missing_key_and_version() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read("nope", "v").await.unwrap_err(),
            PlinthError::KeyNotFound(_)
        ));

        store.write("m", b"1", &envelope("one")).await.unwrap();
        assert!(matches!(
            store.read("m", "bogus").await.unwrap_err(),
            PlinthError::VersionNotFound { .. }
        ));
    }
}
