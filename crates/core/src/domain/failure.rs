// ApiFailure - the single failure value produced by the request client

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Status codes with a meaning beyond plain HTTP
pub mod status {
    /// No response at all (offline, DNS failure, connection refused)
    pub const NETWORK: u16 = 0;
    /// Request deadline exceeded on the client side
    pub const TIMEOUT: u16 = 408;
}

/// Maximum length of a raw text body used as a failure message
const MAX_TEXT_MESSAGE_LEN: usize = 500;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport failed while the process was flagged offline
    Offline,
    /// Transport failed while online (retry budget exhausted)
    Network,
    /// Client-side deadline fired
    Timeout,
    /// HTTP status below 500
    Client,
    /// HTTP status 500 and above
    Server,
    /// Response arrived but its body could not be decoded
    Decode,
}

/// Typed failure of a console API call
///
/// `status` is always populated (0 = network/offline, 408 = timeout,
/// otherwise the HTTP status) and `message` is never empty.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (status {status})")]
pub struct ApiFailure {
    pub message: String,
    pub status: u16,
    pub payload: Option<Value>,
    pub kind: FailureKind,
}

impl ApiFailure {
    fn new(kind: FailureKind, status: u16, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("Request failed with status {}", status);
        }
        Self {
            message,
            status,
            payload: None,
            kind,
        }
    }

    pub fn offline() -> Self {
        Self::new(
            FailureKind::Offline,
            status::NETWORK,
            "You appear to be offline. Check your network connection.",
        )
    }

    pub fn network(detail: impl AsRef<str>) -> Self {
        Self::new(
            FailureKind::Network,
            status::NETWORK,
            format!("Network error: {}", detail.as_ref()),
        )
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            status::TIMEOUT,
            format!("Request timed out after {} ms", after.as_millis()),
        )
    }

    pub fn decode(status: u16, detail: impl AsRef<str>) -> Self {
        Self::new(
            FailureKind::Decode,
            status,
            format!("Malformed response: {}", detail.as_ref()),
        )
    }

    /// Build a failure from a non-2xx HTTP response
    ///
    /// Message precedence: JSON `message` field, JSON `error` field,
    /// non-empty raw text, then the status line.
    pub fn from_http(status: u16, status_text: &str, body: &[u8]) -> Self {
        let kind = if status >= 500 {
            FailureKind::Server
        } else {
            FailureKind::Client
        };
        let status_line = format!("HTTP {} {}", status, status_text).trim().to_string();

        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        let payload = serde_json::from_str::<Value>(text).ok();

        let structured = payload.as_ref().and_then(|v| {
            ["message", "error"].iter().find_map(|field| {
                v.get(*field)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        });

        let message = match structured {
            Some(msg) => msg,
            None if !text.is_empty() => text.chars().take(MAX_TEXT_MESSAGE_LEN).collect(),
            None => status_line,
        };

        Self {
            payload,
            ..Self::new(kind, status, message)
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::Server | FailureKind::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_prefers_json_message_field() {
        let body = br#"{"message":"Test case name is required","field":"name"}"#;
        let failure = ApiFailure::from_http(422, "Unprocessable Entity", body);

        assert_eq!(failure.message, "Test case name is required");
        assert_eq!(failure.status, 422);
        assert_eq!(failure.kind, FailureKind::Client);
        assert_eq!(
            failure.payload,
            Some(json!({"message": "Test case name is required", "field": "name"}))
        );
    }

    #[test]
    fn test_message_falls_back_to_error_field() {
        let failure = ApiFailure::from_http(500, "Internal Server Error", br#"{"error":"boom"}"#);
        assert_eq!(failure.message, "boom");
        assert!(failure.is_retryable());
    }

    #[test]
    fn test_message_falls_back_to_raw_text() {
        let failure = ApiFailure::from_http(502, "Bad Gateway", b"upstream unavailable\n");
        assert_eq!(failure.message, "upstream unavailable");
        assert!(failure.payload.is_none());
    }

    #[test]
    fn test_message_falls_back_to_status_line() {
        let failure = ApiFailure::from_http(503, "Service Unavailable", b"");
        assert_eq!(failure.message, "HTTP 503 Service Unavailable");
    }

    #[test]
    fn test_json_without_message_field_uses_raw_text() {
        let failure = ApiFailure::from_http(404, "Not Found", br#"{"code":17}"#);
        assert_eq!(failure.message, r#"{"code":17}"#);
        assert_eq!(failure.payload, Some(json!({"code": 17})));

        let failure = ApiFailure::from_http(400, "Bad Request", br#" "oops" "#);
        assert_eq!(failure.message, r#""oops""#);
    }

    #[test]
    fn test_special_statuses() {
        assert_eq!(ApiFailure::offline().status, status::NETWORK);
        assert_eq!(ApiFailure::network("refused").status, status::NETWORK);
        assert_eq!(
            ApiFailure::timeout(Duration::from_secs(10)).status,
            status::TIMEOUT
        );
        assert!(!ApiFailure::offline().is_retryable());
        assert!(!ApiFailure::timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_message_never_empty() {
        let failure = ApiFailure::decode(200, "");
        assert!(!failure.message.is_empty());

        let failure = ApiFailure::from_http(418, "", b"   ");
        assert_eq!(failure.message, "HTTP 418");
    }
}
