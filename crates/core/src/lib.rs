// Testdeck Core - Console services & Ports
// NO infrastructure dependencies (hexagonal layout)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{
    ExecutionMonitor, NotificationService, PollingRegistry, RequestClient, RequestOptions,
};
pub use config::{ClientConfig, ConsoleConfig, NotificationConfig, PollingConfig};
pub use domain::{ApiFailure, HttpMethod, JobKind, NotificationId, ResponseBody, Severity};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
