//! Errors from talking to the diagnosis backend.

use serde::Deserialize;

/// Network or parse failure from a backend call.
///
/// No retries are attempted for any variant: the caller surfaces the
/// failure and keeps its local state so the user can try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Backend is not reachable at {0}")]
    Connection(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Backend returned error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Error body the backend sends with non-success statuses.
#[derive(Debug, Deserialize)]
struct DetailBody {
    detail: String,
}

impl ApiError {
    /// Map a non-success response to an error, preferring the backend's
    /// `detail` message over the raw body.
    pub fn from_status(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<DetailBody>(&body)
            .map(|b| b.detail)
            .unwrap_or(body);
        if status == 404 {
            ApiError::NotFound(message)
        } else {
            ApiError::Status {
                status,
                body: message,
            }
        }
    }

    /// Classify a transport-level failure.
    pub fn from_transport(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_connect() {
            ApiError::Connection(base_url.to_string())
        } else if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::ResponseParsing(err.to_string())
        } else {
            ApiError::HttpClient(err.to_string())
        }
    }
}
