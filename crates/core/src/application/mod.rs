// Application Layer - Console services

pub mod monitor;
pub mod notification;
mod panic_guard;
pub mod polling;
pub mod request_client;
pub mod retry;
mod stop;

// Re-exports
pub use monitor::{ExecutionMonitor, RefreshCallback};
pub use notification::{NotificationService, NotifyOptions};
pub use polling::{FnProbe, JobProbe, PollingRegistry};
pub use request_client::{RequestClient, RequestOptions, CORRELATION_HEADER};
pub use retry::{RetryDecision, RetryPolicy};
