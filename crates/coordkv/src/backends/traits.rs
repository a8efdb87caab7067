//! KV store trait definitions
//!
//! Defines the capability contract every backend satisfies and the small value
//! types shared between them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KvError;

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Consul HTTP KV API (TTL emulated by a background sweep)
    Consul,
    /// etcd v2 keys API (native TTL, multi-peer failover)
    Etcd,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Consul => write!(f, "consul"),
            BackendKind::Etcd => write!(f, "etcd"),
        }
    }
}

impl BackendKind {
    pub fn from_str(s: &str) -> Result<Self, KvError> {
        match s.trim().to_lowercase().as_str() {
            "consul" => Ok(BackendKind::Consul),
            "etcd" | "etcd2" | "etcdv2" => Ok(BackendKind::Etcd),
            _ => Err(KvError::InvalidConfig(format!("unknown backend: {}", s))),
        }
    }
}

/// A key/value record returned from list operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    pub key: String,
    pub value: String,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Core key-value store trait
///
/// All backends implement this trait so callers can pick one by configuration
/// and use it without knowing which coordination service sits behind it.
///
/// Error policy is the same for every backend: transport, status and decode
/// failures are always returned, and [`KvError::KeyNotFound`] is returned only
/// when the backend confirmed the key is absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Which backend serves this store
    fn backend_kind(&self) -> BackendKind;

    /// Write `value` at `key`, creating or overwriting it.
    ///
    /// Backends with a configured TTL re-arm the entry's expiry on every write.
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Read the current value at `key`
    async fn get(&self, key: &str) -> Result<String, KvError>;

    /// Remove the entry at `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// List the entries directly under `path` (non-recursive).
    ///
    /// Returns an empty vector when nothing matches.
    async fn list(&self, path: &str) -> Result<Vec<KvPair>, KvError>;

    /// Check whether `key` currently holds a value
    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
