// Port Layer - Interfaces for external capabilities

pub mod connectivity;
pub mod id_provider; // For deterministic testing
pub mod presenter;
pub mod sleeper; // Virtual time in tests
pub mod time_provider;
pub mod transport;

// Re-exports
pub use connectivity::{Connectivity, OnlineFlag};
pub use id_provider::{IdProvider, ShortIdProvider};
pub use presenter::{NotificationPresenter, TracingPresenter};
pub use sleeper::{Sleeper, TokioSleeper};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};
