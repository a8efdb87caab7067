//! Consul KV backend
//!
//! Talks to the Consul HTTP KV API (`/v1/kv/...`). Consul has no per-key
//! TTL, so when a TTL is configured every write carries an absolute expiry in
//! the entry's numeric `Flags` field and a background [`ExpirySweeper`]
//! deletes entries once that time has passed.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::expiry::{Expiry, ExpirySweeper};
use super::path::{directory_prefix, encode_key, is_immediate_child};
use super::traits::{BackendKind, KvPair, KvStore};
use crate::error::KvError;
use crate::services::ConsulConfig;

const KV_API_PREFIX: &str = "/v1/kv/";

/// Shortest sweep interval accepted, so a zero interval cannot spin
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// One entry as returned by `GET /v1/kv/<key>`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ConsulKvEntry {
    pub key: String,
    #[serde(default)]
    pub flags: u64,
    /// Base64-encoded value, null for empty values
    #[serde(default)]
    pub value: Option<String>,
}

impl ConsulKvEntry {
    pub(crate) fn expiry(&self) -> Expiry {
        Expiry::from_flags(self.flags)
    }

    pub(crate) fn decoded_value(&self) -> Result<String, KvError> {
        let Some(encoded) = &self.value else {
            return Ok(String::new());
        };
        let bytes = STANDARD.decode(encoded).map_err(|e| {
            KvError::Decode(format!("invalid base64 value for {}: {}", self.key, e))
        })?;
        String::from_utf8(bytes)
            .map_err(|e| KvError::Decode(format!("value for {} is not UTF-8: {}", self.key, e)))
    }
}

/// Thin client for the Consul KV endpoints.
///
/// Cheap to clone: the expiry sweeper owns its own copy.
#[derive(Debug, Clone)]
pub(crate) struct ConsulClient {
    http: Client,
    base_url: String,
    datacenter: Option<String>,
}

impl ConsulClient {
    pub(crate) fn new(config: &ConsulConfig) -> Result<Self, KvError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KvError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            datacenter: config.datacenter.clone(),
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}{}{}", self.base_url, KV_API_PREFIX, encode_key(key))
    }

    fn with_datacenter(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.datacenter {
            Some(dc) => request.query(&[("dc", dc.as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, KvError> {
        self.with_datacenter(request)
            .send()
            .await
            .map_err(|e| KvError::Connection {
                endpoint: self.base_url.clone(),
                source: e,
            })
    }

    async fn read_body(response: Response) -> Result<String, KvError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KvError::Decode(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(KvError::Status {
                status,
                message: body.trim().to_string(),
            });
        }

        Ok(body)
    }

    async fn read_entries(response: Response) -> Result<Vec<ConsulKvEntry>, KvError> {
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            KvError::Decode(format!("Failed to parse response: {} - Body: {}", e, body))
        })
    }

    /// Write `value` at `key` with its expiry stamped into `Flags`
    pub(crate) async fn put(&self, key: &str, value: &str, expiry: Expiry) -> Result<(), KvError> {
        let url = self.url(key);
        debug!(%url, flags = expiry.to_flags(), "Consul PUT");

        let request = self
            .http
            .put(&url)
            .query(&[("flags", expiry.to_flags())])
            .body(value.to_string());
        let body = Self::read_body(self.send(request).await?).await?;

        let accepted: bool = serde_json::from_str(body.trim()).map_err(|e| {
            KvError::Decode(format!("Failed to parse response: {} - Body: {}", e, body))
        })?;
        if !accepted {
            return Err(KvError::Mismatch(format!("Consul rejected write to {}", key)));
        }

        Ok(())
    }

    /// Read one entry; `None` when Consul answers 404
    pub(crate) async fn get(&self, key: &str) -> Result<Option<ConsulKvEntry>, KvError> {
        let url = self.url(key);
        debug!(%url, "Consul GET");

        let response = self.send(self.http.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entries = Self::read_entries(response).await?;
        Ok(entries.into_iter().next())
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<(), KvError> {
        let url = self.url(key);
        debug!(%url, "Consul DELETE");

        let response = self.send(self.http.delete(&url)).await?;
        Self::read_body(response).await?;
        Ok(())
    }

    /// Every entry whose key starts with `prefix`, at any depth
    pub(crate) async fn list(&self, prefix: &str) -> Result<Vec<ConsulKvEntry>, KvError> {
        let url = self.url(prefix);
        debug!(%url, "Consul GET recurse");

        let request = self.http.get(&url).query(&[("recurse", "true")]);
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        Self::read_entries(response).await
    }
}

/// Consul-backed [`KvStore`]
///
/// The HTTP client is created on first use. If a TTL is configured, the
/// expiry sweeper is started at the same moment and keeps running until
/// [`ConsulBackend::shutdown`] is called or the backend is dropped.
pub struct ConsulBackend {
    config: ConsulConfig,
    sweep_interval: Duration,
    client: OnceCell<ConsulClient>,
    cancellation_token: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ConsulBackend {
    pub fn new(config: ConsulConfig) -> Self {
        let sweep_interval = config.sweep_interval();
        Self {
            config,
            sweep_interval,
            client: OnceCell::new(),
            cancellation_token: CancellationToken::new(),
            sweeper: Mutex::new(None),
        }
    }

    /// Override the sweep interval with sub-second precision
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    pub fn ttl(&self) -> u64 {
        self.config.ttl
    }

    /// True while the expiry sweeper task is alive
    pub fn is_sweeping(&self) -> bool {
        let slot = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the expiry sweeper and wait for it to exit.
    ///
    /// The backend is closed afterwards: every later operation fails with
    /// [`KvError::ShutDown`], so no entry is written with an expiry that
    /// nothing would enforce.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();

        let handle = {
            let mut slot = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Expiry sweeper ended abnormally: {}", e);
            }
        }
    }

    async fn connect(&self) -> Result<&ConsulClient, KvError> {
        if self.cancellation_token.is_cancelled() {
            return Err(KvError::ShutDown);
        }

        self.client
            .get_or_try_init(|| async {
                let client = ConsulClient::new(&self.config)?;
                info!(
                    address = %client.base_url,
                    ttl = self.config.ttl,
                    "Connected Consul KV client"
                );

                if self.config.ttl > 0 {
                    self.start_sweeper(client.clone());
                }

                Ok::<_, KvError>(client)
            })
            .await
    }

    fn start_sweeper(&self, client: ConsulClient) {
        let sweeper = ExpirySweeper::new(client, self.sweep_interval);
        let handle = tokio::spawn(sweeper.run(self.cancellation_token.clone()));

        let mut slot = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(handle);
    }
}

impl Default for ConsulBackend {
    fn default() -> Self {
        Self::new(ConsulConfig::default())
    }
}

impl Drop for ConsulBackend {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

#[async_trait]
impl KvStore for ConsulBackend {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Consul
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let client = self.connect().await?;
        let expiry = Expiry::from_ttl(self.config.ttl, chrono::Utc::now().timestamp());
        client.put(key, value, expiry).await
    }

    async fn get(&self, key: &str) -> Result<String, KvError> {
        let client = self.connect().await?;
        match client.get(key).await? {
            Some(entry) => entry.decoded_value(),
            None => Err(KvError::KeyNotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let client = self.connect().await?;
        client.delete(key).await
    }

    async fn list(&self, path: &str) -> Result<Vec<KvPair>, KvError> {
        let client = self.connect().await?;
        let prefix = directory_prefix(path);

        client
            .list(&prefix)
            .await?
            .into_iter()
            .filter(|entry| is_immediate_child(&prefix, &entry.key))
            .map(|entry| {
                let value = entry.decoded_value()?;
                Ok(KvPair::new(entry.key, value))
            })
            .collect()
    }
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(mock_server: &MockServer, ttl: u64) -> ConsulBackend {
        ConsulBackend::new(ConsulConfig {
            address: mock_server.uri(),
            ttl,
            ..Default::default()
        })
    }

    fn entry(key: &str, value: &str, flags: u64) -> serde_json::Value {
        serde_json::json!({
            "LockIndex": 0,
            "Key": key,
            "Flags": flags,
            "Value": STANDARD.encode(value),
            "CreateIndex": 10,
            "ModifyIndex": 10
        })
    }

    async fn requests_matching(mock_server: &MockServer, verb: &str, url_path: &str) -> usize {
        mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == url_path)
            .count()
    }

    #[tokio::test]
    async fn test_set_without_ttl_writes_zero_flags() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/kv/app/leader"))
            .and(query_param("flags", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        backend.set("app/leader", "node-1").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, b"node-1");
        assert!(!backend.is_sweeping());
    }

    #[tokio::test]
    async fn test_set_with_ttl_stamps_expiry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/kv/session/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 30);
        let before = chrono::Utc::now().timestamp();
        backend.set("session/abc", "alive").await.unwrap();
        let after = chrono::Utc::now().timestamp();

        let requests = mock_server.received_requests().await.unwrap();
        let flags: i64 = requests[0]
            .url
            .query_pairs()
            .find(|(k, _)| k == "flags")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        assert!(flags >= before + 30 && flags <= after + 30);
        assert!(backend.is_sweeping());

        backend.shutdown().await;
        assert!(!backend.is_sweeping());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/kv/app/leader"))
            .and(body_string("node-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([entry("app/leader", "node-1", 0)])),
            )
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        backend.set("app/leader", "node-1").await.unwrap();
        assert_eq!(backend.get("app/leader").await.unwrap(), "node-1");
    }

    #[tokio::test]
    async fn test_set_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(ResponseTemplate::new(200).set_body_string("false"))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        let result = backend.set("app/leader", "node-1").await;
        assert!(matches!(result, Err(KvError::Mismatch(_))));
    }

    #[tokio::test]
    async fn test_get_returns_value() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([entry("app/leader", "node-1", 0)])),
            )
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        assert_eq!(backend.get("app/leader").await.unwrap(), "node-1");
        assert!(backend.exists("app/leader").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_key_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        let result = backend.get("app/missing").await;
        assert!(matches!(result, Err(KvError::KeyNotFound(ref k)) if k == "app/missing"));
        assert!(!backend.exists("app/missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_server_error_is_propagated() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(ResponseTemplate::new(500).set_body_string("No cluster leader"))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        match backend.get("app/leader").await {
            Err(KvError::Status { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "No cluster leader");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_unreachable_agent() {
        let backend = ConsulBackend::new(ConsulConfig {
            address: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        });

        let result = backend.get("app/leader").await;
        assert!(matches!(result, Err(ref e) if e.is_transport()));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        backend.delete("app/leader").await.unwrap();
        assert!(backend.get("app/leader").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_returns_immediate_children_only() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/"))
            .and(query_param("recurse", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                entry("app/", "", 0),
                entry("app/leader", "node-1", 0),
                entry("app/port", "8080", 1_700_000_000),
                entry("app/config/", "", 0),
                entry("app/config/debug", "true", 0)
            ])))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        let pairs = backend.list("/app").await.unwrap();

        assert_eq!(
            pairs,
            vec![
                KvPair::new("app/leader", "node-1"),
                KvPair::new("app/port", "8080"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_empty_prefix() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/nothing/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0);
        assert!(backend.list("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_datacenter_query_param() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/leader"))
            .and(query_param("dc", "eu-west"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([entry("app/leader", "node-1", 0)])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = ConsulBackend::new(ConsulConfig {
            address: mock_server.uri(),
            datacenter: Some("eu-west".to_string()),
            ..Default::default()
        });
        assert_eq!(backend.get("app/leader").await.unwrap(), "node-1");
    }

    #[tokio::test]
    async fn test_sweep_once_deletes_only_expired_entries() {
        let mock_server = MockServer::start().await;
        let now = chrono::Utc::now().timestamp();

        Mock::given(method("GET"))
            .and(path("/v1/kv/"))
            .and(query_param("recurse", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                entry("session/expired", "a", (now - 10) as u64),
                entry("session/fresh", "b", (now + 3600) as u64),
                entry("config/forever", "c", 0)
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&mock_server)
            .await;

        let client = ConsulClient::new(&ConsulConfig {
            address: mock_server.uri(),
            ..Default::default()
        })
        .unwrap();
        let sweeper = ExpirySweeper::new(client, Duration::from_secs(60));

        let deleted = sweeper.sweep_once(now).await.unwrap();
        assert_eq!(deleted, 1);

        assert_eq!(
            requests_matching(&mock_server, "DELETE", "/v1/kv/session/expired").await,
            1
        );
        assert_eq!(
            requests_matching(&mock_server, "DELETE", "/v1/kv/session/fresh").await,
            0
        );
        assert_eq!(
            requests_matching(&mock_server, "DELETE", "/v1/kv/config/forever").await,
            0
        );
    }

    #[tokio::test]
    async fn test_sweep_once_keeps_going_after_delete_failure() {
        let mock_server = MockServer::start().await;
        let now = chrono::Utc::now().timestamp();

        Mock::given(method("GET"))
            .and(path("/v1/kv/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                entry("a", "1", (now - 5) as u64),
                entry("b", "2", (now - 5) as u64)
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/v1/kv/a"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/v1/kv/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&mock_server)
            .await;

        let client = ConsulClient::new(&ConsulConfig {
            address: mock_server.uri(),
            ..Default::default()
        })
        .unwrap();
        let sweeper = ExpirySweeper::new(client, Duration::from_secs(60));

        assert_eq!(sweeper.sweep_once(now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_background_sweep_expires_keys_and_stops_on_shutdown() {
        let mock_server = MockServer::start().await;
        let now = chrono::Utc::now().timestamp();

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/"))
            .and(query_param("recurse", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                entry("k", "v", (now - 1) as u64),
                entry("forever", "v", 0)
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 1).with_sweep_interval(Duration::from_millis(50));
        backend.set("k", "v").await.unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(requests_matching(&mock_server, "DELETE", "/v1/kv/k").await >= 1);
        assert_eq!(
            requests_matching(&mock_server, "DELETE", "/v1/kv/forever").await,
            0
        );

        backend.shutdown().await;
        let sweeps = requests_matching(&mock_server, "GET", "/v1/kv/").await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            requests_matching(&mock_server, "GET", "/v1/kv/").await,
            sweeps
        );
    }

    #[tokio::test]
    async fn test_operations_fail_after_shutdown() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 30);
        backend.set("session/abc", "alive").await.unwrap();
        backend.shutdown().await;

        assert!(matches!(
            backend.set("session/abc", "alive").await,
            Err(KvError::ShutDown)
        ));
        assert!(matches!(backend.get("session/abc").await, Err(KvError::ShutDown)));
        assert!(matches!(backend.list("session").await, Err(KvError::ShutDown)));
    }

    #[tokio::test]
    async fn test_no_sweeper_without_ttl() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/app/leader"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([entry("app/leader", "node-1", 0)])),
            )
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 0).with_sweep_interval(Duration::from_millis(20));
        backend.get("app/leader").await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!backend.is_sweeping());
        assert_eq!(requests_matching(&mock_server, "GET", "/v1/kv/").await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_starts_sweeper() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&mock_server)
            .await;

        let backend = backend_for(&mock_server, 60);
        let (a, b, c) = tokio::join!(
            backend.set("a", "1"),
            backend.set("b", "2"),
            backend.set("c", "3")
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert!(backend.is_sweeping());
        backend.shutdown().await;
        assert!(!backend.is_sweeping());
    }
}
