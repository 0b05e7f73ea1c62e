// Domain Layer - Values owned by the console services

pub mod failure;
pub mod job;
pub mod notification;
pub mod request;

// Re-exports
pub use failure::{ApiFailure, FailureKind};
pub use job::{JobId, JobKind, MonitorState, MonitoredJob, TerminalOutcome};
pub use notification::{Notification, NotificationAction, NotificationId, Severity};
pub use request::{ContentClass, HttpMethod, PendingRequest, ResponseBody};
