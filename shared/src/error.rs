//! Error types shared by every adapter.

use thiserror::Error;

use crate::companion::SummaryError;
use crate::llm::InvocationFailure;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model invocation error that escaped an orchestrator
    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationFailure),

    #[error("Summary error: {0}")]
    Summary(#[from] SummaryError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::Summary(SummaryError::EmptyTranscript) => 400,
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Validation("bad".into()).status_code(), 400);
        assert_eq!(Error::NotFound("session".into()).status_code(), 404);
        assert_eq!(Error::from(SummaryError::EmptyTranscript).status_code(), 400);
        assert_eq!(
            Error::from(SummaryError::Invocation(InvocationFailure::Timeout { deadline_ms: 1 }))
                .status_code(),
            500
        );
        assert_eq!(
            Error::from(InvocationFailure::MissingCredential).status_code(),
            500
        );
    }
}
