//! coordkv: a uniform key-value layer over distributed coordination backends
//!
//! Provides one [`KvStore`] trait with two interchangeable implementations:
//!
//! - **Consul**: talks to the Consul HTTP KV API. Per-key expiration is
//!   emulated with an absolute expiry stamped on every write and a background
//!   sweep that deletes stale entries.
//! - **etcd**: talks to the etcd v2 keys API over a list of peers, failing over
//!   to the next peer on connection errors and validating every echoed reply.
//!
//! # Usage
//!
//! ```ignore
//! use coordkv::{KvConfig, KvStoreFactory};
//!
//! let config = KvConfig::from_env()?;
//! let store = KvStoreFactory::create(&config)?;
//!
//! store.set("app/leader", "node-1").await?;
//! let leader = store.get("app/leader").await?;
//! for pair in store.list("app").await? {
//!     println!("{} = {}", pair.key, pair.value);
//! }
//! ```

pub mod backends;
pub mod error;
pub mod services;

pub use backends::{BackendKind, ConsulBackend, EtcdBackend, Expiry, KvPair, KvStore};
pub use error::KvError;
pub use services::{BackendConfig, ConsulConfig, EtcdConfig, KvConfig, KvStoreFactory};
