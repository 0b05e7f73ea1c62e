//! Testdeck Console API

use crate::error::{Result, SdkError};
use crate::types::{
    BatchRequest, BatchStarted, ExecutionStarted, JobStatus, Listing, Schedule, TestCase,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use testdeck_core::{HttpMethod, RequestClient, ResponseBody};

/// Typed access to the console backend
///
/// Every call goes through the shared [`RequestClient`], so retries,
/// deadlines and failure typing apply uniformly.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use testdeck_core::{ClientConfig, RequestClient};
/// use testdeck_sdk::ConsoleApi;
/// # use testdeck_core::port::HttpTransport;
///
/// # async fn example(transport: Arc<dyn HttpTransport>) -> Result<(), Box<dyn std::error::Error>> {
/// let client = Arc::new(RequestClient::new(
///     ClientConfig::with_base_url("http://127.0.0.1:8080/api"),
///     transport,
/// ));
/// let api = ConsoleApi::new(client);
/// let started = api.run_batch(&[1, 2, 3]).await?;
/// println!("Batch: {}", started.batch_id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConsoleApi {
    client: Arc<RequestClient>,
}

impl ConsoleApi {
    pub fn new(client: Arc<RequestClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<RequestClient> {
        &self.client
    }

    pub async fn list_test_cases(&self) -> Result<Vec<TestCase>> {
        let listing: Listing<TestCase> = self.client.get_json("/testcases").await?;
        Ok(listing.into_vec())
    }

    pub async fn get_test_case(&self, id: i64) -> Result<TestCase> {
        Ok(self.client.get_json(&format!("/testcases/{}", id)).await?)
    }

    pub async fn create_test_case(&self, test_case: &TestCase) -> Result<TestCase> {
        if test_case.name.trim().is_empty() {
            return Err(SdkError::InvalidArgument(
                "test case name must not be empty".to_string(),
            ));
        }
        Ok(self.client.post_json("/testcases", test_case).await?)
    }

    pub async fn update_test_case(&self, id: i64, test_case: &TestCase) -> Result<TestCase> {
        Ok(self
            .client
            .send_json(HttpMethod::Put, &format!("/testcases/{}", id), test_case)
            .await?)
    }

    pub async fn delete_test_case(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("/testcases/{}", id)).await?;
        Ok(())
    }

    /// Launch one test case; monitor the returned id as a single job
    pub async fn execute_test_case(&self, id: i64) -> Result<ExecutionStarted> {
        let reply = self
            .client
            .post(&format!("/testcases/{}/execute", id), None)
            .await?;
        decode(reply)
    }

    /// Launch several test cases as one batch
    pub async fn run_batch(&self, test_case_ids: &[i64]) -> Result<BatchStarted> {
        if test_case_ids.is_empty() {
            return Err(SdkError::InvalidArgument(
                "a batch needs at least one test case".to_string(),
            ));
        }
        let request = BatchRequest {
            test_case_ids: test_case_ids.to_vec(),
        };
        Ok(self.client.post_json("/batches", &request).await?)
    }

    pub async fn execution_status(&self, execution_id: &str) -> Result<JobStatus> {
        Ok(self
            .client
            .get_json(&format!("/executions/{}", execution_id))
            .await?)
    }

    pub async fn batch_status(&self, batch_id: &str) -> Result<JobStatus> {
        Ok(self.client.get_json(&format!("/batches/{}", batch_id)).await?)
    }

    pub async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let listing: Listing<Schedule> = self.client.get_json("/schedules").await?;
        Ok(listing.into_vec())
    }

    /// Run a schedule now; the backend answers with the batch it started
    pub async fn trigger_schedule(&self, schedule_id: i64) -> Result<BatchStarted> {
        let reply = self
            .client
            .post(&format!("/schedules/{}/trigger", schedule_id), None)
            .await?;
        decode(reply)
    }

    /// Fetch a rendered report (PDF, spreadsheet, HTML, ...)
    pub async fn download_report(&self, report_id: &str) -> Result<Vec<u8>> {
        match self
            .client
            .get(&format!("/reports/{}/download", report_id))
            .await?
        {
            ResponseBody::Binary(bytes) => Ok(bytes),
            ResponseBody::Text(text) => Ok(text.into_bytes()),
            ResponseBody::Json(value) => Ok(serde_json::to_vec(&value)?),
            ResponseBody::Empty => Err(SdkError::UnexpectedBody(format!(
                "report {} has no content",
                report_id
            ))),
        }
    }
}

/// Decode a bodiless-request reply; launch endpoints must answer with JSON
fn decode<T: DeserializeOwned>(reply: ResponseBody) -> Result<T> {
    match reply {
        ResponseBody::Json(value) => Ok(serde_json::from_value(value)?),
        other => Err(SdkError::UnexpectedBody(format!(
            "expected a JSON reply, got {}",
            describe(&other)
        ))),
    }
}

fn describe(body: &ResponseBody) -> &'static str {
    match body {
        ResponseBody::Json(_) => "json",
        ResponseBody::Text(_) => "text",
        ResponseBody::Binary(_) => "binary",
        ResponseBody::Empty => "an empty body",
    }
}
