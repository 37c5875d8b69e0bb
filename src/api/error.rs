use thiserror::Error;

use crate::wizard::SubmissionError;

/// Errors talking to the cluster management API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => SubmissionError::with_status(status, message),
            other => SubmissionError::new(other.to_string()),
        }
    }
}
