//! Configuration records for the console services
//!
//! Every recognized option is listed here with its default; callers build
//! these from a file/environment (see the CLI) or use `Default`.

use crate::domain::JobKind;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request deadline (10s)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default attempt budget per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default linear backoff unit (1s)
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default notification lifetime (5s)
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5_000;

/// Default number of simultaneously visible notifications
pub const DEFAULT_MAX_VISIBLE: usize = 5;

/// Default poll interval for a single execution (3s)
pub const DEFAULT_SINGLE_INTERVAL_MS: u64 = 3_000;

/// Default poll interval for a batch (5s)
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 5_000;

/// Request client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin + path prefix prepended to every endpoint
    pub base_url: String,
    pub timeout_ms: u64,
    /// Total attempt budget (first attempt included)
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Join the base URL and an endpoint with exactly one slash
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Notification queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub duration_ms: u64,
    pub max_visible: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
            max_visible: DEFAULT_MAX_VISIBLE,
        }
    }
}

impl NotificationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Polling registry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub single_interval_ms: u64,
    pub batch_interval_ms: u64,
    /// Status endpoint for single executions; `{id}` is replaced by the job id
    pub execution_status_path: String,
    /// Status endpoint for batches; `{id}` is replaced by the job id
    pub batch_status_path: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            single_interval_ms: DEFAULT_SINGLE_INTERVAL_MS,
            batch_interval_ms: DEFAULT_BATCH_INTERVAL_MS,
            execution_status_path: "/executions/{id}".to_string(),
            batch_status_path: "/batches/{id}".to_string(),
        }
    }
}

impl PollingConfig {
    pub fn interval_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Single => Duration::from_millis(self.single_interval_ms),
            JobKind::Batch => Duration::from_millis(self.batch_interval_ms),
        }
    }

    /// Status endpoint for a job; the id is encoded as one path segment
    pub fn status_path(&self, kind: JobKind, job_id: &str) -> String {
        let template = match kind {
            JobKind::Single => &self.execution_status_path,
            JobKind::Batch => &self.batch_status_path,
        };
        template.replace("{id}", &urlencoding::encode(job_id))
    }
}

/// Aggregate configuration for a console process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub client: ClientConfig,
    pub notifications: NotificationConfig,
    pub polling: PollingConfig,
}

impl ConsoleConfig {
    /// Reject values the services cannot work with
    pub fn validate(&self) -> Result<()> {
        let base = self.client.base_url.trim();
        if base.is_empty() {
            return Err(AppError::Config("client.base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "client.base_url must be an http(s) URL, got '{}'",
                base
            )));
        }
        if self.client.timeout_ms == 0 {
            return Err(AppError::Config("client.timeout_ms must be > 0".into()));
        }
        if self.client.max_retries == 0 {
            return Err(AppError::Config(
                "client.max_retries must be at least 1 (it counts the first attempt)".into(),
            ));
        }
        if self.notifications.max_visible == 0 {
            return Err(AppError::Config(
                "notifications.max_visible must be at least 1".into(),
            ));
        }
        if self.polling.single_interval_ms == 0 || self.polling.batch_interval_ms == 0 {
            return Err(AppError::Config("polling intervals must be > 0".into()));
        }
        for template in [
            &self.polling.execution_status_path,
            &self.polling.batch_status_path,
        ] {
            if !template.contains("{id}") {
                return Err(AppError::Config(format!(
                    "status path '{}' is missing the {{id}} placeholder",
                    template
                )));
            }
        }
        Ok(())
    }
}
