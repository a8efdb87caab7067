//! Store construction from configuration

use std::sync::Arc;

use tracing::{debug, error};

use super::config::{BackendConfig, KvConfig};
use crate::backends::{ConsulBackend, EtcdBackend, KvStore};
use crate::error::KvError;

/// Builds the [`KvStore`] selected by a [`KvConfig`]
pub struct KvStoreFactory;

impl KvStoreFactory {
    /// Create a store instance for the configured backend.
    ///
    /// No connection is made here; each backend connects on its first call.
    pub fn create(config: &KvConfig) -> Result<Arc<dyn KvStore>, KvError> {
        config.validate().map_err(|e| {
            error!("Invalid KV configuration: {}", e);
            e
        })?;

        debug!(backend = %config.backend.kind(), "Creating KV store");

        match &config.backend {
            BackendConfig::Consul(consul) => Ok(Arc::new(ConsulBackend::new(consul.clone()))),
            BackendConfig::Etcd(etcd) => Ok(Arc::new(EtcdBackend::new(etcd.clone()))),
        }
    }

    /// Create a store from the process environment (see [`KvConfig::from_env`])
    pub fn from_env() -> Result<Arc<dyn KvStore>, KvError> {
        Self::create(&KvConfig::from_env()?)
    }
}
