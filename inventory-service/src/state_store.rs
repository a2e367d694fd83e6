use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common_observability::InventoryMetrics;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    pub value: Vec<u8>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),
    #[error("state store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("etag mismatch for key {0}")]
    EtagMismatch(String),
    #[error("state store returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Key-value state addressed by product id.
///
/// `put` with an etag is a conditional write: it must fail with
/// [`StoreError::EtagMismatch`] when the stored version moved on.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StateEntry>, StoreError>;
    async fn put(&self, key: &str, value: Vec<u8>, etag: Option<&str>) -> Result<(), StoreError>;
}

// ---------------- Dapr sidecar implementation ----------------

#[derive(Clone)]
pub struct DaprStateStore {
    client: Client,
    base_url: Url,
    store_name: String,
}

impl DaprStateStore {
    pub fn new(endpoint: &str, store_name: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| StoreError::Unavailable(format!("invalid sidecar endpoint {endpoint}: {e}")))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { client, base_url, store_name: store_name.into() })
    }

    fn state_url(&self, key: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Unavailable(format!("sidecar endpoint {} cannot be a base", self.base_url)))?;
            segments.pop_if_empty().extend(["v1.0", "state", self.store_name.as_str()]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl StateStore for DaprStateStore {
    async fn get(&self, key: &str) -> Result<Option<StateEntry>, StoreError> {
        let resp = self
            .client
            .get(self.state_url(Some(key))?)
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedStatus { status: status.as_u16(), body });
        }
        let etag = resp
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let value = resp.bytes().await.map_err(transport_error)?;
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(StateEntry { value: value.to_vec(), etag }))
    }

    async fn put(&self, key: &str, value: Vec<u8>, etag: Option<&str>) -> Result<(), StoreError> {
        // The sidecar stores JSON values verbatim; anything else goes in as a string.
        let value: Value = serde_json::from_slice(&value)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&value).into_owned()));
        let mut item = json!({ "key": key, "value": value });
        if let Some(etag) = etag {
            item["etag"] = Value::String(etag.to_owned());
            item["options"] = json!({ "concurrency": "first-write" });
        }
        let resp = self
            .client
            .post(self.state_url(None)?)
            .json(&json!([item]))
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::CONFLICT {
            return Err(StoreError::EtagMismatch(key.to_owned()));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::UnexpectedStatus { status: status.as_u16(), body })
    }
}

// ---------------- In-Memory Implementation ----------------

#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    inner: Arc<RwLock<HashMap<String, (Vec<u8>, u64)>>>,
    writes: Arc<AtomicU64>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds raw bytes without counting as a write.
    pub async fn insert_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        let mut guard = self.inner.write().await;
        let version = guard.get(key).map(|(_, v)| v + 1).unwrap_or(1);
        guard.insert(key.to_owned(), (value.into(), version));
    }

    pub async fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.read().await.get(key).map(|(value, _)| value.clone())
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<StateEntry>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).map(|(value, version)| StateEntry {
            value: value.clone(),
            etag: Some(version.to_string()),
        }))
    }

    async fn put(&self, key: &str, value: Vec<u8>, etag: Option<&str>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let current = guard.get(key).map(|(_, version)| *version);
        if let Some(expected) = etag {
            if current.map(|v| v.to_string()).as_deref() != Some(expected) {
                return Err(StoreError::EtagMismatch(key.to_owned()));
            }
        }
        let next = current.unwrap_or(0) + 1;
        guard.insert(key.to_owned(), (value, next));
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------- Shared handle ----------------

/// The one store handle built at startup and shared by the reconciler and the
/// query service. Bounds every call by the configured deadline and records its
/// latency.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn StateStore>,
    deadline: Duration,
    metrics: Arc<InventoryMetrics>,
}

impl StoreClient {
    pub fn new(store: Arc<dyn StateStore>, deadline: Duration, metrics: Arc<InventoryMetrics>) -> Self {
        Self { store, deadline, metrics }
    }

    pub async fn get(&self, key: &str) -> Result<Option<StateEntry>, StoreError> {
        self.timed("get", self.store.get(key)).await
    }

    pub async fn put(&self, key: &str, value: Vec<u8>, etag: Option<&str>) -> Result<(), StoreError> {
        self.timed("put", self.store.put(key, value, etag)).await
    }

    async fn timed<T, F>(&self, op: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.deadline)),
        };
        self.metrics
            .store_op_duration_seconds
            .with_label_values(&[op])
            .observe(start.elapsed().as_secs_f64());
        result
    }
}
