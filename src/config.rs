use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProjectError;

pub const NEGATIVE_DATASET: &str = "negative-v1.1";
pub const SEARCH_DATASET: &str = "search-v2.1";

/// Tunables for autosave, uploads and the remote endpoints.
///
/// Every field has a default, so a partial TOML document is enough:
///
/// ```
/// use cavstudio::SyncConfig;
///
/// let config = SyncConfig::from_toml_str("debounce_ms = 250").unwrap();
/// assert_eq!(config.debounce_ms, 250);
/// assert_eq!(config.max_save_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last mutation before a save is enqueued.
    pub debounce_ms: u64,
    /// Failed attempts after which a queued save is dropped.
    pub max_save_attempts: u32,
    /// Pause between a failed save and its retry.
    pub retry_backoff_ms: u64,
    /// Upper bound on simultaneous image uploads.
    pub upload_concurrency: usize,
    pub negative_dataset: String,
    pub search_dataset: String,
    pub server_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            max_save_attempts: 3,
            retry_backoff_ms: 1000,
            upload_concurrency: 8,
            negative_dataset: NEGATIVE_DATASET.to_string(),
            search_dataset: SEARCH_DATASET.to_string(),
            server_url: "http://localhost:8000".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ProjectError> {
        let config: SyncConfig =
            toml::from_str(source).map_err(|e| ProjectError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProjectError> {
        if self.max_save_attempts == 0 {
            return Err(ProjectError::Config(
                "max_save_attempts must be at least 1".into(),
            ));
        }
        if self.upload_concurrency == 0 {
            return Err(ProjectError::Config(
                "upload_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn with_max_save_attempts(mut self, attempts: u32) -> Self {
        self.max_save_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency.max(1);
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
