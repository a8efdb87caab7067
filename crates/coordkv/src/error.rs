//! Error types for the KV layer

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur talking to a KV backend
#[derive(Error, Debug)]
pub enum KvError {
    /// The endpoint could not be reached (no HTTP response was received)
    #[error("Connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No endpoints available")]
    NoPeers,

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Expected action \"{expected}\", got \"{actual}\"")]
    UnexpectedAction {
        expected: &'static str,
        actual: String,
    },

    #[error("Response mismatch: {0}")]
    Mismatch(String),

    #[error("Backend returned status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend was shut down and accepts no further operations
    #[error("KV backend has been shut down")]
    ShutDown,
}

impl KvError {
    /// True when the backend confirmed that the key does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::KeyNotFound(_))
    }

    /// True for connection-level failures, the only errors etcd fails over on
    pub fn is_transport(&self) -> bool {
        matches!(self, KvError::Connection { .. } | KvError::NoPeers)
    }
}
