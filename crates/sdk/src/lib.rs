//! Testdeck SDK - typed console API
//!
//! Thin typed layer over the core [`RequestClient`](testdeck_core::RequestClient):
//! test-case CRUD, single and batch execution triggers, schedules, status
//! and report downloads.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use testdeck_core::{ClientConfig, JobKind, RequestClient};
//! use testdeck_sdk::ConsoleApi;
//! # use testdeck_core::port::HttpTransport;
//!
//! # async fn example(transport: Arc<dyn HttpTransport>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(RequestClient::new(ClientConfig::default(), transport));
//! let api = ConsoleApi::new(client);
//!
//! let started = api.execute_test_case(7).await?;
//! let status = api.execution_status(&started.execution_id).await?;
//! println!("{} is {}", started.execution_id, status.status);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::ConsoleApi;
pub use error::{Result, SdkError};
pub use types::{BatchRequest, BatchStarted, ExecutionStarted, JobStatus, Schedule, TestCase};
