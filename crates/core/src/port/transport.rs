// HTTP Transport Port
// One raw request/response exchange; retries and decoding live in the client

use crate::domain::HttpMethod;
use async_trait::async_trait;
use thiserror::Error;

/// Raw request handed to the transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response returned by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: text.into().into_bytes(),
        }
    }

    pub fn binary(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            content_type: Some(content_type.to_string()),
            body,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            content_type: None,
            body: Vec::new(),
        }
    }
}

/// Transport-level failures (no HTTP response was obtained)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Other(String),
}

/// HTTP Transport trait
///
/// Implementations:
/// - ReqwestTransport (infra-http)
/// - mocks::ScriptedTransport (tests)
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one exchange. Non-2xx statuses are returned as `Ok`.
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Reason phrases for the statuses the console deals with
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// One scripted transport outcome
    #[derive(Debug, Clone)]
    pub enum ScriptedReply {
        Respond(TransportResponse),
        Fail(TransportError),
        /// Never resolves (a hung connection)
        Hang,
    }

    /// Transport replaying a fixed script and recording every request
    ///
    /// Once the script runs out, the fallback reply (if any) repeats;
    /// otherwise the transport fails with `TransportError::Other`.
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<ScriptedReply>>,
        fallback: Option<ScriptedReply>,
        requests: Mutex<Vec<(Instant, TransportRequest)>>,
    }

    impl ScriptedTransport {
        pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
            Self {
                script: Mutex::new(replies.into_iter().collect()),
                fallback: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn repeating(reply: ScriptedReply) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: Some(reply),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Add replies to the end of the script
        pub fn push(&self, reply: ScriptedReply) {
            self.script.lock().unwrap().push_back(reply);
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<TransportRequest> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, r)| r.clone())
                .collect()
        }

        /// Virtual-clock instants at which each request was sent
        pub fn sent_at(&self) -> Vec<Instant> {
            self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(
            &self,
            request: &TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((Instant::now(), request.clone()));

            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.fallback.clone());

            match next {
                Some(ScriptedReply::Respond(response)) => Ok(response),
                Some(ScriptedReply::Fail(err)) => Err(err),
                Some(ScriptedReply::Hang) => futures::future::pending().await,
                None => Err(TransportError::Other("script exhausted".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_helpers() {
        let r = TransportResponse::json(201, json!({"id": 7}));
        assert!(r.is_success());
        assert_eq!(r.status_text, "Created");
        assert_eq!(r.body, br#"{"id":7}"#.to_vec());

        let r = TransportResponse::empty(503);
        assert!(!r.is_success());
        assert_eq!(r.status_text, "Service Unavailable");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = TransportRequest {
            method: HttpMethod::Get,
            url: "http://localhost/api".to_string(),
            headers: vec![("X-Request-ID".to_string(), "abc123xyz".to_string())],
            body: None,
        };
        assert_eq!(req.header("x-request-id"), Some("abc123xyz"));
        assert_eq!(req.header("content-type"), None);
    }
}
