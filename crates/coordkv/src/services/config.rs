//! KV backend configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backends::BackendKind;
use crate::error::KvError;

/// Default Consul agent address
pub const DEFAULT_CONSUL_ADDRESS: &str = "http://localhost:8500";
/// Default interval between two expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// Default per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Selects the backend (`consul` or `etcd`)
pub const ENV_BACKEND: &str = "COORDKV_BACKEND";
/// Entry TTL in seconds, 0 disables expiration
pub const ENV_TTL: &str = "COORDKV_TTL";
/// Consul agent address, same variable the Consul tooling reads
pub const ENV_CONSUL_ADDRESS: &str = "CONSUL_HTTP_ADDR";

// Helper functions for serde defaults
fn default_consul_address() -> String {
    DEFAULT_CONSUL_ADDRESS.to_string()
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// A zero timeout would fail every request, so it falls back to the default
fn request_timeout(secs: u64) -> Duration {
    match secs {
        0 => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        secs => Duration::from_secs(secs),
    }
}

/// Consul backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulConfig {
    /// Agent address, e.g. "http://localhost:8500" or "consul.internal:8500"
    #[serde(default = "default_consul_address")]
    pub address: String,

    /// Datacenter to query (agent's own datacenter if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    /// Entry TTL in seconds (0 = entries never expire)
    #[serde(default)]
    pub ttl: u64,

    /// Seconds between two expiry sweeps (only used when ttl > 0)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_consul_address(),
            datacenter: None,
            ttl: 0,
            sweep_interval_secs: default_sweep_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ConsulConfig {
    /// Address with a scheme and without a trailing slash.
    ///
    /// A bare "host:port" gets "http://" prepended.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        }
    }

    /// Per-request timeout; 0 means the default
    pub fn request_timeout(&self) -> Duration {
        request_timeout(self.request_timeout_secs)
    }

    /// Interval between expiry sweeps; 0 means the default
    pub fn sweep_interval(&self) -> Duration {
        match self.sweep_interval_secs {
            0 => Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

/// etcd backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Peer base URLs tried in order. When unset, peers come from
    /// ETCDCTL_PEERS / ETCDCTL_ENDPOINTS, then from the local defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<String>>,

    /// Entry TTL in seconds (0 = entries never expire)
    #[serde(default)]
    pub ttl: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            peers: None,
            ttl: 0,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl EtcdConfig {
    /// Per-request timeout; 0 means the default
    pub fn request_timeout(&self) -> Duration {
        request_timeout(self.request_timeout_secs)
    }
}

/// Backend selection with its settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Consul(ConsulConfig),
    Etcd(EtcdConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Consul(_) => BackendKind::Consul,
            BackendConfig::Etcd(_) => BackendKind::Etcd,
        }
    }
}

/// Top-level configuration for obtaining a KV store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    pub backend: BackendConfig,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Consul(ConsulConfig::default()),
        }
    }
}

impl KvConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, KvError> {
        let config: KvConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self, KvError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable source.
    ///
    /// Reads COORDKV_BACKEND (default consul), COORDKV_TTL (default 0) and,
    /// for Consul, CONSUL_HTTP_ADDR. etcd peers are resolved by the backend
    /// itself on first use.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, KvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup(ENV_BACKEND).filter(|v| !v.trim().is_empty()) {
            Some(value) => BackendKind::from_str(&value)?,
            None => BackendKind::Consul,
        };

        let ttl = match lookup(ENV_TTL).filter(|v| !v.trim().is_empty()) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                KvError::InvalidConfig(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_TTL, value
                ))
            })?,
            None => 0,
        };

        let backend = match kind {
            BackendKind::Consul => BackendConfig::Consul(ConsulConfig {
                address: lookup(ENV_CONSUL_ADDRESS)
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(default_consul_address),
                ttl,
                ..Default::default()
            }),
            BackendKind::Etcd => BackendConfig::Etcd(EtcdConfig {
                ttl,
                ..Default::default()
            }),
        };

        let config = Self { backend };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KvError> {
        match &self.backend {
            BackendConfig::Consul(consul) => {
                if consul.address.trim().is_empty() {
                    return Err(KvError::InvalidConfig(
                        "consul address must not be empty".to_string(),
                    ));
                }
                if consul.request_timeout_secs == 0 {
                    return Err(KvError::InvalidConfig(
                        "request_timeout_secs must be positive".to_string(),
                    ));
                }
                if consul.ttl > 0 && consul.sweep_interval_secs == 0 {
                    return Err(KvError::InvalidConfig(
                        "sweep_interval_secs must be positive when ttl is set".to_string(),
                    ));
                }
            }
            BackendConfig::Etcd(etcd) => {
                if etcd.request_timeout_secs == 0 {
                    return Err(KvError::InvalidConfig(
                        "request_timeout_secs must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
