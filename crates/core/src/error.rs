// Central Error Type for the console core

use thiserror::Error;

/// Application-level error type
///
/// Request failures travel as [`ApiFailure`](crate::domain::ApiFailure);
/// this type covers setup problems (bad configuration, bad input records).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("API failure: {0}")]
    Api(#[from] crate::domain::ApiFailure),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
