//! Resilient Request Client
//!
//! Wraps every outbound call with a deadline, linear-backoff retries for
//! server errors, and typed failures. Callers always get either a decoded
//! [`ResponseBody`] or an [`ApiFailure`], never a raw transport error.

use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::config::ClientConfig;
use crate::domain::{
    ApiFailure, ContentClass, HttpMethod, PendingRequest, ResponseBody,
};
use crate::port::{
    Connectivity, HttpTransport, IdProvider, OnlineFlag, ShortIdProvider, Sleeper, TokioSleeper,
    TransportError, TransportRequest, TransportResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the per-call correlation id
pub const CORRELATION_HEADER: &str = "X-Request-ID";

/// Per-call overrides of [`ClientConfig`]
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    /// Extra headers; a header named like a default one replaces it
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outcome of one attempt before classification
enum Attempt {
    Response(TransportResponse),
    Transport(TransportError),
    DeadlineExceeded,
}

/// HTTP client with timeout, retry-with-backoff and typed failures
pub struct RequestClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    connectivity: Arc<dyn Connectivity>,
    id_provider: Arc<dyn IdProvider>,
    retry_policy: RetryPolicy,
}

impl RequestClient {
    /// Create a client with production timer, online flag and id source
    pub fn new(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_ports(
            config,
            transport,
            Arc::new(TokioSleeper),
            Arc::new(OnlineFlag::default()),
            Arc::new(ShortIdProvider),
        )
    }

    /// Create a client with every capability injected
    pub fn with_ports(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        connectivity: Arc<dyn Connectivity>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        let retry_policy = RetryPolicy::new(config.base_delay());
        Self {
            config,
            transport,
            sleeper,
            connectivity,
            id_provider,
            retry_policy,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a request against an absolute URL
    pub async fn request(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiFailure> {
        self.request_with_status(url, method, body, options)
            .await
            .map(|(_, body)| body)
    }

    /// Like [`request`](Self::request), also returning the 2xx status
    pub async fn request_with_status(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<(u16, ResponseBody), ApiFailure> {
        let correlation_id = self.id_provider.generate_id();
        let headers = self.build_headers(&correlation_id, options.headers);

        let mut pending = PendingRequest {
            correlation_id,
            url: url.to_string(),
            method,
            body: body.cloned(),
            headers,
            timeout: options.timeout.unwrap_or_else(|| self.config.timeout()),
            max_retries: options.max_retries.unwrap_or(self.config.max_retries).max(1),
            attempt: 0,
        };

        let raw = TransportRequest {
            method,
            url: pending.url.clone(),
            headers: pending.headers.clone(),
            body: pending.body.as_ref().map(|b| b.to_string().into_bytes()),
        };

        loop {
            pending.attempt += 1;
            debug!(
                correlation_id = %pending.correlation_id,
                method = %method,
                url = %pending.url,
                attempt = pending.attempt,
                "Sending request"
            );

            let failure = match self.send_with_deadline(&raw, pending.timeout).await {
                Attempt::Response(response) if response.is_success() => {
                    debug!(
                        correlation_id = %pending.correlation_id,
                        status = response.status,
                        bytes = response.body.len(),
                        "Request succeeded"
                    );
                    let status = response.status;
                    return decode_body(response).map(|body| (status, body));
                }
                Attempt::Response(response) => ApiFailure::from_http(
                    response.status,
                    &response.status_text,
                    &response.body,
                ),
                Attempt::DeadlineExceeded => {
                    warn!(
                        correlation_id = %pending.correlation_id,
                        url = %pending.url,
                        timeout_ms = pending.timeout.as_millis() as u64,
                        "Request timed out"
                    );
                    return Err(ApiFailure::timeout(pending.timeout));
                }
                Attempt::Transport(err) => {
                    if !self.connectivity.is_online() {
                        warn!(
                            correlation_id = %pending.correlation_id,
                            url = %pending.url,
                            error = %err,
                            "Request failed while offline"
                        );
                        return Err(ApiFailure::offline());
                    }
                    match err {
                        TransportError::Timeout => return Err(ApiFailure::timeout(pending.timeout)),
                        other => ApiFailure::network(other.to_string()),
                    }
                }
            };

            match self.retry_policy.decide(&pending, &failure) {
                RetryDecision::Retry(delay) => self.sleeper.sleep(delay).await,
                RetryDecision::GiveUp => {
                    warn!(
                        correlation_id = %pending.correlation_id,
                        url = %pending.url,
                        status = failure.status,
                        attempts = pending.attempt,
                        error = %failure.message,
                        "Request failed"
                    );
                    return Err(failure);
                }
            }
        }
    }

    pub async fn get(&self, endpoint: &str) -> Result<ResponseBody, ApiFailure> {
        self.get_with(endpoint, RequestOptions::default()).await
    }

    pub async fn get_with(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiFailure> {
        self.request(&self.config.url_for(endpoint), HttpMethod::Get, None, options)
            .await
    }

    /// GET `endpoint`, keeping the response status alongside the body
    pub async fn get_with_status(&self, endpoint: &str) -> Result<(u16, ResponseBody), ApiFailure> {
        self.request_with_status(
            &self.config.url_for(endpoint),
            HttpMethod::Get,
            None,
            RequestOptions::default(),
        )
        .await
    }

    pub async fn post(&self, endpoint: &str, body: Option<&Value>) -> Result<ResponseBody, ApiFailure> {
        self.request(
            &self.config.url_for(endpoint),
            HttpMethod::Post,
            body,
            RequestOptions::default(),
        )
        .await
    }

    pub async fn put(&self, endpoint: &str, body: Option<&Value>) -> Result<ResponseBody, ApiFailure> {
        self.request(
            &self.config.url_for(endpoint),
            HttpMethod::Put,
            body,
            RequestOptions::default(),
        )
        .await
    }

    pub async fn patch(&self, endpoint: &str, body: Option<&Value>) -> Result<ResponseBody, ApiFailure> {
        self.request(
            &self.config.url_for(endpoint),
            HttpMethod::Patch,
            body,
            RequestOptions::default(),
        )
        .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<ResponseBody, ApiFailure> {
        self.request(
            &self.config.url_for(endpoint),
            HttpMethod::Delete,
            None,
            RequestOptions::default(),
        )
        .await
    }

    /// GET and decode the JSON body into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiFailure> {
        let (status, body) = self.get_with_status(endpoint).await?;
        typed(status, body)
    }

    /// Send `body` as JSON with `method` and decode the JSON reply into `T`
    pub async fn send_json<B, T>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiFailure::decode(0, format!("request body not serializable: {}", e)))?;
        let (status, reply) = self
            .request_with_status(
                &self.config.url_for(endpoint),
                method,
                Some(&value),
                RequestOptions::default(),
            )
            .await?;
        typed(status, reply)
    }

    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Post, endpoint, body).await
    }

    fn build_headers(
        &self,
        correlation_id: &str,
        overrides: Vec<(String, String)>,
    ) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (CORRELATION_HEADER.to_string(), correlation_id.to_string()),
        ];
        for (name, value) in overrides {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        headers
    }

    async fn send_with_deadline(&self, request: &TransportRequest, timeout: Duration) -> Attempt {
        tokio::select! {
            biased;
            result = self.transport.send(request) => match result {
                Ok(response) => Attempt::Response(response),
                Err(err) => Attempt::Transport(err),
            },
            _ = self.sleeper.sleep(timeout) => Attempt::DeadlineExceeded,
        }
    }
}

/// Decode a 2xx response according to its declared content type
fn decode_body(response: TransportResponse) -> Result<ResponseBody, ApiFailure> {
    match ContentClass::from_content_type(response.content_type.as_deref()) {
        ContentClass::Json => {
            if response.body.iter().all(u8::is_ascii_whitespace) {
                return Ok(ResponseBody::Empty);
            }
            serde_json::from_slice(&response.body)
                .map(ResponseBody::Json)
                .map_err(|e| ApiFailure::decode(response.status, e.to_string()))
        }
        ContentClass::Text => Ok(ResponseBody::Text(
            String::from_utf8_lossy(&response.body).into_owned(),
        )),
        ContentClass::Binary => Ok(ResponseBody::Binary(response.body)),
        ContentClass::Unknown => Ok(ResponseBody::Empty),
    }
}

fn typed<T: DeserializeOwned>(status: u16, body: ResponseBody) -> Result<T, ApiFailure> {
    let value = match body {
        ResponseBody::Json(v) => v,
        ResponseBody::Empty => Value::Null,
        ResponseBody::Text(_) | ResponseBody::Binary(_) => {
            return Err(ApiFailure::decode(status, "expected a JSON body"));
        }
    };
    serde_json::from_value(value).map_err(|e| ApiFailure::decode(status, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailureKind;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::sleeper::mocks::RecordingSleeper;
    use crate::port::transport::mocks::{ScriptedReply, ScriptedTransport};
    use serde::Deserialize;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(10);
    const BASE_DELAY: Duration = Duration::from_millis(1000);

    struct Harness {
        client: RequestClient,
        transport: Arc<ScriptedTransport>,
        sleeper: Arc<RecordingSleeper>,
        online: Arc<OnlineFlag>,
    }

    fn harness(transport: ScriptedTransport) -> Harness {
        let transport = Arc::new(transport);
        let sleeper = Arc::new(RecordingSleeper::new());
        let online = Arc::new(OnlineFlag::default());
        let client = RequestClient::with_ports(
            ClientConfig::with_base_url("http://qa.local/api"),
            transport.clone(),
            sleeper.clone(),
            online.clone(),
            Arc::new(SequentialIdProvider::default()),
        );
        Harness {
            client,
            transport,
            sleeper,
            online,
        }
    }

    fn respond(r: TransportResponse) -> ScriptedReply {
        ScriptedReply::Respond(r)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_decodes_json() {
        let h = harness(ScriptedTransport::new([respond(TransportResponse::json(
            200,
            json!({"id": 7, "name": "login"}),
        ))]));

        let body = h.client.get("/testcases/7").await.unwrap();

        assert_eq!(body, ResponseBody::Json(json!({"id": 7, "name": "login"})));
        assert_eq!(h.transport.call_count(), 1);
        let sent = &h.transport.requests()[0];
        assert_eq!(sent.url, "http://qa.local/api/testcases/7");
        assert_eq!(sent.header("Content-Type"), Some("application/json"));
        assert_eq!(sent.header(CORRELATION_HEADER), Some("req-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_retried_with_linear_backoff() {
        let h = harness(ScriptedTransport::new([
            respond(TransportResponse::empty(503)),
            respond(TransportResponse::empty(503)),
            respond(TransportResponse::json(200, json!({"id": 7}))),
        ]));

        let body = h.client.get("/testcases").await.unwrap();

        assert_eq!(body.into_json(), Some(json!({"id": 7})));
        assert_eq!(h.transport.call_count(), 3);
        assert_eq!(
            h.sleeper.recorded_except(TIMEOUT),
            vec![BASE_DELAY, BASE_DELAY * 2]
        );

        let sent_at = h.transport.sent_at();
        assert_eq!(sent_at[1] - sent_at[0], BASE_DELAY);
        assert_eq!(sent_at[2] - sent_at[1], BASE_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_surface_last_error() {
        let h = harness(ScriptedTransport::new([
            respond(TransportResponse::json(500, json!({"message": "db down"}))),
            respond(TransportResponse::json(502, json!({"message": "gateway"}))),
            respond(TransportResponse::json(503, json!({"message": "still down"}))),
        ]));

        let failure = h.client.get("/testcases").await.unwrap_err();

        assert_eq!(failure.status, 503);
        assert_eq!(failure.message, "still down");
        assert_eq!(failure.kind, FailureKind::Server);
        assert_eq!(h.transport.call_count(), 3);
        // No backoff after the final attempt
        assert_eq!(
            h.sleeper.recorded_except(TIMEOUT),
            vec![BASE_DELAY, BASE_DELAY * 2]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_single_attempt() {
        let h = harness(ScriptedTransport::repeating(respond(TransportResponse::json(
            404,
            json!({"message": "Test case 99 not found"}),
        ))));

        let failure = h.client.get("/testcases/99").await.unwrap_err();

        assert_eq!(failure.status, 404);
        assert_eq!(failure.message, "Test case 99 not found");
        assert_eq!(h.transport.call_count(), 1);
        assert!(h.sleeper.recorded_except(TIMEOUT).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_connection_times_out_without_retry() {
        let h = harness(ScriptedTransport::repeating(ScriptedReply::Hang));
        let start = tokio::time::Instant::now();

        let failure = h.client.get("/reports").await.unwrap_err();

        assert_eq!(failure.status, 408);
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(h.transport.call_count(), 1);
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout_override() {
        let h = harness(ScriptedTransport::repeating(ScriptedReply::Hang));

        let failure = h
            .client
            .get_with(
                "/reports",
                RequestOptions::default().with_timeout(Duration::from_millis(250)),
            )
            .await
            .unwrap_err();

        assert_eq!(failure.status, 408);
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_millis(250)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_transport_failure_is_immediate() {
        let h = harness(ScriptedTransport::repeating(ScriptedReply::Fail(
            TransportError::Connect("connection refused".into()),
        )));
        h.online.set_online(false);

        let failure = h.client.get("/testcases").await.unwrap_err();

        assert_eq!(failure.status, 0);
        assert_eq!(failure.kind, FailureKind::Offline);
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_transport_failure_is_retried() {
        let h = harness(ScriptedTransport::new([
            ScriptedReply::Fail(TransportError::Connect("connection refused".into())),
            respond(TransportResponse::text(200, "pong")),
        ]));

        let body = h.client.get("/health").await.unwrap();

        assert_eq!(body, ResponseBody::Text("pong".to_string()));
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_override() {
        let h = harness(ScriptedTransport::repeating(respond(TransportResponse::empty(500))));

        let failure = h
            .client
            .get_with("/testcases", RequestOptions::default().with_max_retries(5))
            .await
            .unwrap_err();

        assert_eq!(failure.status, 500);
        assert_eq!(h.transport.call_count(), 5);
        assert_eq!(
            h.sleeper.recorded_except(TIMEOUT),
            vec![BASE_DELAY, BASE_DELAY * 2, BASE_DELAY * 3, BASE_DELAY * 4]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_type_dispatch() {
        let h = harness(ScriptedTransport::new([
            respond(TransportResponse::binary(200, "application/pdf", vec![0x25, 0x50])),
            respond(TransportResponse::empty(204)),
            respond(TransportResponse {
                status: 200,
                status_text: "OK".into(),
                content_type: Some("application/json".into()),
                body: b"{not json".to_vec(),
            }),
        ]));

        assert_eq!(
            h.client.get("/reports/1/download").await.unwrap(),
            ResponseBody::Binary(vec![0x25, 0x50])
        );
        assert_eq!(h.client.delete("/testcases/1").await.unwrap(), ResponseBody::Empty);

        let failure = h.client.get("/testcases").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Decode);
        assert_eq!(failure.status, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_headers_and_body_forwarded() {
        let h = harness(ScriptedTransport::repeating(respond(TransportResponse::json(
            201,
            json!({"id": 12}),
        ))));

        h.client
            .request(
                "http://qa.local/api/testcases",
                HttpMethod::Post,
                Some(&json!({"name": "checkout"})),
                RequestOptions::default().with_header("content-type", "application/merge-patch+json"),
            )
            .await
            .unwrap();

        let sent = &h.transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.header("Content-Type"), Some("application/merge-patch+json"));
        assert_eq!(
            sent.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .count(),
            1
        );
        assert_eq!(sent.body.as_deref(), Some(br#"{"name":"checkout"}"#.as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_helpers() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Created {
            id: u64,
        }

        let h = harness(ScriptedTransport::new([
            respond(TransportResponse::json(201, json!({"id": 12}))),
            respond(TransportResponse::text(200, "plain")),
        ]));

        let created: Created = h
            .client
            .post_json("/testcases", &json!({"name": "checkout"}))
            .await
            .unwrap();
        assert_eq!(created, Created { id: 12 });

        let failure = h.client.get_json::<Created>("/testcases/12").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Decode);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_decode_failure_keeps_response_status() {
        #[derive(Debug, Deserialize)]
        struct Created {
            #[allow(dead_code)]
            id: u64,
        }

        let h = harness(ScriptedTransport::new([
            respond(TransportResponse::json(201, json!({"id": "not-a-number"}))),
            respond(TransportResponse::text(202, "accepted")),
        ]));

        let failure = h
            .client
            .post_json::<_, Created>("/testcases", &json!({"name": "checkout"}))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Decode);
        assert_eq!(failure.status, 201);

        let failure = h.client.get_json::<Created>("/batches/b-1").await.unwrap_err();
        assert_eq!(failure.status, 202);

        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_call_gets_own_correlation_id() {
        let h = harness(ScriptedTransport::repeating(respond(TransportResponse::empty(204))));

        h.client.get("/a").await.unwrap();
        h.client.get("/b").await.unwrap();

        let ids: Vec<_> = h
            .transport
            .requests()
            .iter()
            .map(|r| r.header(CORRELATION_HEADER).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["req-1", "req-2"]);
    }
}
