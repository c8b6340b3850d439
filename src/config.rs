use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{QimbError, Result};
use crate::services::dedup::EvictionPolicy;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DedupConfig {
    pub max_entries: Option<usize>,
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PushConfig {
    /// Local socket address the webhook listener binds, e.g. `0.0.0.0:8080`.
    pub listen_addr: String,
    pub path: Option<String>,
    /// Externally reachable URL registered with the gateway on subscribe.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub endpoint: String,
    pub poll_interval_ms: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub dedup: Option<DedupConfig>,
    pub push: Option<PushConfig>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            poll_interval_ms: None,
            connect_timeout_secs: None,
            request_timeout_secs: None,
            dedup: None,
            push: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| QimbError::Config(e.to_string()))?;
        let config: ClientConfig =
            serde_json::from_str(&content).map_err(|e| QimbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(QimbError::Config("endpoint must not be empty".to_string()));
        }
        if let Some(dedup) = &self.dedup {
            if dedup.max_entries == Some(0) {
                return Err(QimbError::Config(
                    "dedup.max_entries must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        let ms = self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Duration::from_millis(ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        let Some(dedup) = &self.dedup else {
            return EvictionPolicy::Unbounded;
        };
        let max_age = dedup.ttl_seconds.map(Duration::from_secs);
        match (dedup.max_entries, max_age) {
            (None, None) => EvictionPolicy::Unbounded,
            (Some(max_entries), None) => EvictionPolicy::MaxEntries(max_entries),
            (None, Some(max_age)) => EvictionPolicy::MaxAge(max_age),
            (Some(max_entries), Some(max_age)) => EvictionPolicy::Bounded {
                max_entries,
                max_age,
            },
        }
    }

    pub fn push_path(&self) -> String {
        let path = self
            .push
            .as_ref()
            .and_then(|push| push.path.as_deref())
            .map(|path| path.trim())
            .filter(|path| !path.is_empty())
            .unwrap_or("/");
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }
}
