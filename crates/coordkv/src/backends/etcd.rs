//! etcd KV backend
//!
//! Talks to the etcd v2 keys API (`/v2/keys/...`). Every request walks the
//! peer list in order and stops at the first peer that answers at all; an
//! HTTP error status from a peer is final and is not retried elsewhere.
//! Write and delete replies are checked against what was requested, so a
//! peer that silently did something else is reported as an error.


use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::path::{encode_key, etcd_canonical};
use super::traits::{BackendKind, KvPair, KvStore};
use crate::error::KvError;
use crate::services::EtcdConfig;

const KEYS_API_PREFIX: &str = "/v2/keys/";

/// Comma-separated peer list read when no peers are configured
pub const ENV_ETCD_PEERS: &str = "ETCDCTL_PEERS";
/// Comma-separated endpoint list appended after ETCDCTL_PEERS
pub const ENV_ETCD_ENDPOINTS: &str = "ETCDCTL_ENDPOINTS";
/// Used when neither configuration nor environment name a peer
pub const DEFAULT_ETCD_PEERS: [&str; 2] = ["http://127.0.0.1:2379", "http://127.0.0.1:4001"];

/// etcd v2 reply envelope
#[derive(Debug, Deserialize)]
struct EtcdResponse {
    action: String,
    #[serde(default)]
    node: Option<EtcdNode>,
    #[serde(default, rename = "prevNode")]
    prev_node: Option<EtcdNode>,
}

#[derive(Debug, Default, Deserialize)]
struct EtcdNode {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    nodes: Vec<EtcdNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtcdErrorResponse {
    error_code: u32,
    message: String,
    #[serde(default)]
    cause: Option<String>,
}

/// Peer list resolution: configured peers win, then the two environment
/// variables concatenated, then [`DEFAULT_ETCD_PEERS`].
pub fn resolve_peers<F>(configured: Option<&[String]>, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(configured) = configured {
        let peers = clean_peers(configured.iter().map(String::as_str));
        if !peers.is_empty() {
            return peers;
        }
    }

    let mut peers = Vec::new();
    for var in [ENV_ETCD_PEERS, ENV_ETCD_ENDPOINTS] {
        if let Some(value) = lookup(var) {
            peers.extend(clean_peers(value.split(',')));
        }
    }

    if peers.is_empty() {
        peers = DEFAULT_ETCD_PEERS.iter().map(|p| p.to_string()).collect();
    }

    peers
}

fn clean_peers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    raw.map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn expect_action(reply: &EtcdResponse, expected: &'static str) -> Result<(), KvError> {
    if reply.action != expected {
        return Err(KvError::UnexpectedAction {
            expected,
            actual: reply.action.clone(),
        });
    }
    Ok(())
}

fn status_error(status: StatusCode, body: &str) -> KvError {
    let message = match serde_json::from_str::<EtcdErrorResponse>(body) {
        Ok(err) => match err.cause {
            Some(cause) => format!("{} ({}) [errorCode {}]", err.message, cause, err.error_code),
            None => format!("{} [errorCode {}]", err.message, err.error_code),
        },
        Err(_) => body.trim().to_string(),
    };
    KvError::Status { status, message }
}

struct EtcdConnection {
    client: Client,
    peers: Vec<String>,
}

/// etcd-backed [`KvStore`]
pub struct EtcdBackend {
    config: EtcdConfig,
    connection: OnceCell<EtcdConnection>,
}

impl EtcdBackend {
    pub fn new(config: EtcdConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
        }
    }

    /// Backend talking to exactly these peers
    pub fn with_peers(peers: Vec<String>, ttl: u64) -> Self {
        Self::new(EtcdConfig {
            peers: Some(peers),
            ttl,
            ..Default::default()
        })
    }

    pub fn ttl(&self) -> u64 {
        self.config.ttl
    }

    /// The peer list in use, resolved on first call
    pub async fn peers(&self) -> Result<&[String], KvError> {
        Ok(&self.connect().await?.peers)
    }

    async fn connect(&self) -> Result<&EtcdConnection, KvError> {
        self.connection
            .get_or_try_init(|| async {
                let client = Client::builder()
                    .timeout(self.config.request_timeout())
                    .build()
                    .map_err(|e| {
                        KvError::Client(format!("Failed to create HTTP client: {}", e))
                    })?;

                let peers =
                    resolve_peers(self.config.peers.as_deref(), |name| std::env::var(name).ok());
                info!(?peers, ttl = self.config.ttl, "Connected etcd KV client");

                Ok::<_, KvError>(EtcdConnection { client, peers })
            })
            .await
    }

    /// Send a request built by `build` to each peer in turn until one of
    /// them produces an HTTP response.
    async fn dispatch<F>(&self, build: F) -> Result<Response, KvError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let connection = self.connect().await?;
        let mut last_error: Option<KvError> = None;

        for peer in &connection.peers {
            match build(&connection.client, peer.as_str()).send().await {
                Ok(response) => {
                    debug!(%peer, status = %response.status(), "etcd peer responded");
                    return Ok(response);
                }
                Err(e) => {
                    warn!(%peer, "etcd peer unreachable, trying next: {}", e);
                    last_error = Some(KvError::Connection {
                        endpoint: peer.clone(),
                        source: e,
                    });
                }
            }
        }

        Err(last_error.unwrap_or(KvError::NoPeers))
    }

    fn url(peer: &str, key: &str) -> String {
        format!("{}{}{}", peer, KEYS_API_PREFIX, encode_key(key.trim_end_matches('/')))
    }

    /// Decode a reply; 404 becomes [`KvError::KeyNotFound`] for `key`
    async fn read_reply(response: Response, key: &str) -> Result<EtcdResponse, KvError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KvError::Decode(format!("Failed to read response: {}", e)))?;

        if status == StatusCode::NOT_FOUND {
            return Err(KvError::KeyNotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            KvError::Decode(format!("Failed to parse response: {} - Body: {}", e, body))
        })
    }
}

#[async_trait]
impl KvStore for EtcdBackend {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Etcd
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let ttl = self.config.ttl;
        let response = self
            .dispatch(|client, peer| {
                let url = Self::url(peer, key);
                debug!(%url, ttl, "etcd PUT");
                let request = client.put(&url).form(&[("value", value)]);
                // etcd treats ttl=0 as "expire now", so no TTL means no parameter
                if ttl > 0 {
                    request.query(&[("ttl", ttl)])
                } else {
                    request
                }
            })
            .await?;

        let reply = Self::read_reply(response, key).await?;
        expect_action(&reply, "set")?;

        let node = reply
            .node
            .ok_or_else(|| KvError::Mismatch("set reply has no node".to_string()))?;
        let expected_key = etcd_canonical(key);
        let echoed_value = node.value.as_deref().unwrap_or_default();

        if node.key != expected_key || echoed_value != value {
            return Err(KvError::Mismatch(format!(
                "key/value mismatch, expected \"{}/{}\", got \"{}/{}\"",
                expected_key, value, node.key, echoed_value
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, KvError> {
        let response = self
            .dispatch(|client, peer| {
                let url = Self::url(peer, key);
                debug!(%url, "etcd GET");
                client.get(&url)
            })
            .await?;

        let reply = Self::read_reply(response, key).await?;
        expect_action(&reply, "get")?;

        let node = reply
            .node
            .ok_or_else(|| KvError::Decode(format!("get reply for {} has no node", key)))?;
        if node.dir {
            return Err(KvError::Mismatch(format!("{} is a directory", key)));
        }

        Ok(node.value.unwrap_or_default())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let response = self
            .dispatch(|client, peer| {
                let url = Self::url(peer, key);
                debug!(%url, "etcd DELETE");
                client.delete(&url)
            })
            .await?;

        let reply = match Self::read_reply(response, key).await {
            Ok(reply) => reply,
            Err(e) if e.is_not_found() => {
                debug!(%key, "etcd DELETE of absent key");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        expect_action(&reply, "delete")?;

        let deleted_key = reply.node.map(|n| n.key).unwrap_or_default();
        let expected_key = etcd_canonical(key);
        if deleted_key != expected_key {
            return Err(KvError::Mismatch(format!(
                "expected delete key \"{}\", got \"{}\"",
                expected_key, deleted_key
            )));
        }

        if let Some(prev) = reply.prev_node {
            debug!(key = %prev.key, prev_value = ?prev.value, "etcd key deleted");
        }

        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<KvPair>, KvError> {
        let response = self
            .dispatch(|client, peer| {
                let url = Self::url(peer, path);
                debug!(%url, "etcd GET directory");
                client.get(&url)
            })
            .await?;

        let reply = match Self::read_reply(response, path).await {
            Ok(reply) => reply,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        expect_action(&reply, "get")?;

        let node = reply
            .node
            .ok_or_else(|| KvError::Decode(format!("list reply for {} has no node", path)))?;
        let pairs = node
            .nodes
            .into_iter()
            .filter(|child| !child.dir)
            .map(|child| {
                let key = child.key.trim_start_matches('/').to_string();
                KvPair::new(key, child.value.unwrap_or_default())
            })
            .collect();

        Ok(pairs)
    }
}
