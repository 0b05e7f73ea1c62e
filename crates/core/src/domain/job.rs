// Monitored Job Domain Model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Execution id or batch id, as issued by the backend
pub type JobId = String;

/// Kind of server-side job being watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Single,
    Batch,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Single => write!(f, "single"),
            JobKind::Batch => write!(f, "batch"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "execution" => Ok(JobKind::Single),
            "batch" => Ok(JobKind::Batch),
            other => Err(format!("unknown job kind: {}", other)),
        }
    }
}

/// Monitor lifecycle
///
/// ```text
/// Registered -> Polling -> { Terminal, Cancelled }
///                  ^  |
///                  |  v
///                 Paused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    Registered,
    Polling,
    Paused,
    Terminal,
    Cancelled,
}

/// Registry entry describing one watched job
#[derive(Debug, Clone)]
pub struct MonitoredJob {
    pub id: JobId,
    pub kind: JobKind,
    pub interval: Duration,
    pub state: MonitorState,
    pub last_status: Option<Value>,
    pub polls: u32,
    pub last_polled_at_ms: Option<i64>,
}

impl MonitoredJob {
    pub fn new(id: impl Into<JobId>, kind: JobKind, interval: Duration) -> Self {
        Self {
            id: id.into(),
            kind,
            interval,
            state: MonitorState::Registered,
            last_status: None,
            polls: 0,
            last_polled_at_ms: None,
        }
    }
}

/// Final outcome of a job, derived from its status string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl TerminalOutcome {
    /// Map a backend status string (case-insensitive) to an outcome
    ///
    /// Returns `None` for non-terminal statuses such as RUNNING or QUEUED.
    pub fn from_status(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" | "PASSED" | "SUCCESS" => Some(TerminalOutcome::Succeeded),
            "FAILED" | "ERROR" | "TIMEOUT" => Some(TerminalOutcome::Failed),
            "CANCELLED" | "CANCELED" | "ABORTED" => Some(TerminalOutcome::Cancelled),
            _ => None,
        }
    }

    /// Read the status field of a payload and map it
    pub fn from_payload(payload: &Value) -> Option<Self> {
        status_of(payload).and_then(Self::from_status)
    }
}

/// Extract the status string from a status payload (`status` or `state`)
pub fn status_of(payload: &Value) -> Option<&str> {
    payload
        .get("status")
        .or_else(|| payload.get("state"))
        .and_then(Value::as_str)
}
