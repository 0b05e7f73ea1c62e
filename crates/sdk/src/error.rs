//! SDK Error Types

use testdeck_core::ApiFailure;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Api(#[from] ApiFailure),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedBody(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl SdkError {
    /// HTTP-ish status of the failure (0 when no response was involved)
    pub fn status(&self) -> u16 {
        match self {
            SdkError::Api(failure) => failure.status,
            _ => 0,
        }
    }

    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            SdkError::Api(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }
}
