// Notification Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Notification identifier, unique for the lifetime of a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Severity level of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
    Loading,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Loading => "loading",
        }
    }

    /// Title used when a caller supplies an empty message
    pub fn default_title(&self) -> &'static str {
        match self {
            Severity::Success => "Success",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Information",
            Severity::Loading => "Loading...",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named action attached to a notification
#[derive(Clone)]
pub struct NotificationAction {
    pub label: String,
    handler: Arc<dyn Fn() + Send + Sync>,
}

impl NotificationAction {
    pub fn new(label: impl Into<String>, handler: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn invoke(&self) {
        (self.handler)()
    }
}

impl fmt::Debug for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A user-facing toast message
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    /// `None` means persistent (never auto-dismissed)
    pub duration: Option<Duration>,
    pub actions: Vec<NotificationAction>,
    pub dedup_key: Option<String>,
    pub created_at_ms: i64,
}

impl Notification {
    pub fn is_persistent(&self) -> bool {
        self.duration.is_none()
    }

    pub fn action(&self, label: &str) -> Option<&NotificationAction> {
        self.actions.iter().find(|a| a.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_action_invocation() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let action = NotificationAction::new("Retry", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        action.invoke();
        action.clone().invoke();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(format!("{:?}", action).contains("Retry"));
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        let parsed: Severity = serde_json::from_str("\"loading\"").unwrap();
        assert_eq!(parsed, Severity::Loading);
    }
}
