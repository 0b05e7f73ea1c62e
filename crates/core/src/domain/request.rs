// Request-side domain values

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// HTTP methods used by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound call, alive only while the client works on it
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub correlation_id: String,
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub attempt: u32,
}

impl PendingRequest {
    /// True when no further attempt is allowed after the current one
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_retries
    }
}

/// How a response body should be decoded, derived from its content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Json,
    Text,
    Binary,
    Unknown,
}

impl ContentClass {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return ContentClass::Unknown;
        };
        let mime = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/json" || mime.ends_with("+json") {
            ContentClass::Json
        } else if mime.starts_with("text/") {
            ContentClass::Text
        } else if matches!(
            mime.as_str(),
            "application/octet-stream" | "application/pdf" | "application/zip"
        ) || mime.starts_with("application/vnd.")
            || mime.starts_with("image/")
            || mime.starts_with("audio/")
            || mime.starts_with("video/")
        {
            ContentClass::Binary
        } else {
            ContentClass::Unknown
        }
    }
}

/// Decoded response content
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
    Empty,
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            ResponseBody::Binary(b) => Some(b),
            ResponseBody::Text(s) => Some(s.into_bytes()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }
}
