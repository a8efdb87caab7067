//! KV backend implementations
//!
//! This module contains the [`KvStore`] trait and its implementations for
//! Consul and etcd.

pub mod consul;
pub mod etcd;
pub mod expiry;
mod path;
pub mod traits;

// Re-export commonly used types
pub use consul::ConsulBackend;
pub use etcd::EtcdBackend;
pub use expiry::Expiry;
pub use traits::{BackendKind, KvPair, KvStore};
