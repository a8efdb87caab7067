//! Backend configuration and store construction
//!
//! A caller describes the backend it wants with a [`KvConfig`] and gets a
//! ready-to-use [`crate::KvStore`] from [`KvStoreFactory`].

mod config;
mod factory;

pub use config::{
    BackendConfig, ConsulConfig, EtcdConfig, KvConfig, DEFAULT_CONSUL_ADDRESS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SWEEP_INTERVAL_SECS, ENV_BACKEND, ENV_CONSUL_ADDRESS,
    ENV_TTL,
};
pub use factory::KvStoreFactory;
