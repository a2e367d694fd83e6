use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

use crate::reconciler::{WriteMode, DEFAULT_MAX_WRITE_ATTEMPTS};

pub const DEFAULT_APP_PORT: u16 = 6000;
pub const DEFAULT_DAPR_HTTP_PORT: u16 = 3500;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Dapr,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub dapr_http_endpoint: String,
    pub store_backend: StoreBackend,
    pub store_timeout: Duration,
    pub write_mode: WriteMode,
    pub kafka_bootstrap: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("APP_PORT").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("APP_PORT must be a port number, got {value:?}"))?,
            None => DEFAULT_APP_PORT,
        };
        let dapr_http_endpoint = lookup("DAPR_HTTP_ENDPOINT").unwrap_or_else(|| {
            let dapr_port = lookup("DAPR_HTTP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(DEFAULT_DAPR_HTTP_PORT);
            format!("http://127.0.0.1:{dapr_port}")
        });
        let store_backend = match lookup("STATE_STORE_BACKEND").as_deref() {
            None | Some("dapr") => StoreBackend::Dapr,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STATE_STORE_BACKEND must be 'dapr' or 'memory', got {other:?}"),
        };
        let store_timeout_ms = match lookup("STATE_STORE_TIMEOUT_MS").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<u64>()
                .with_context(|| format!("STATE_STORE_TIMEOUT_MS must be a number of milliseconds, got {value:?}"))?,
            None => DEFAULT_STORE_TIMEOUT_MS,
        };
        let max_attempts = match lookup("STOCK_WRITE_MAX_ATTEMPTS").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<u32>()
                .with_context(|| format!("STOCK_WRITE_MAX_ATTEMPTS must be a positive integer, got {value:?}"))?,
            None => DEFAULT_MAX_WRITE_ATTEMPTS,
        };
        let write_mode = match lookup("STOCK_WRITE_MODE").as_deref() {
            None | Some("last_writer_wins") => WriteMode::LastWriterWins,
            Some("optimistic") => WriteMode::Optimistic { max_attempts: max_attempts.max(1) },
            Some(other) => bail!("STOCK_WRITE_MODE must be 'last_writer_wins' or 'optimistic', got {other:?}"),
        };
        let kafka_bootstrap = lookup("KAFKA_BOOTSTRAP").unwrap_or_else(|| "localhost:9092".to_string());

        Ok(Self {
            host,
            port,
            dapr_http_endpoint,
            store_backend,
            store_timeout: Duration::from_millis(store_timeout_ms.max(100)),
            write_mode,
            kafka_bootstrap,
        })
    }
}
