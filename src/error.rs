//! Error taxonomy shared by every capability client and pipeline stage.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, RagError>;

/// Failures surfaced by sources, embedding/completion providers and vector indexes.
#[derive(Debug, Error)]
pub enum RagError {
    /// The requested source document does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The remote service throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Any other remote failure; `retryable` marks transient ones.
    #[error("service error: {message}")]
    Service {
        /// Human-readable failure description.
        message: String,
        /// Whether repeating the call may succeed.
        retryable: bool,
    },
    /// Misconfigured credentials, model, index or dimensionality.
    #[error("configuration error: {0}")]
    Config(String),
    /// Malformed input at an API boundary.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Local filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Builds a non-retryable service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            retryable: false,
        }
    }

    /// Builds a retryable service error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            retryable: true,
        }
    }

    /// True for failures worth repeating after a backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Service { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Classifies an unsuccessful HTTP response from `service`.
    pub fn from_status(service: &str, status: StatusCode, body: &str) -> Self {
        let message = format!("{service} returned {status}: {body}");
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited(message)
        } else if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            Self::Config(message)
        } else if status.is_server_error() {
            Self::transient(message)
        } else {
            Self::service(message)
        }
    }

    /// Classifies a transport-level failure talking to `service`.
    pub fn from_transport(service: &str, err: reqwest::Error) -> Self {
        let retryable = err.is_timeout()
            || err.is_connect()
            || err.is_body()
            || err.is_request()
            || err.is_decode();
        Self::Service {
            message: format!("{service} request failed: {err}"),
            retryable,
        }
    }
}

impl From<tokio_postgres::Error> for RagError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            Self::transient(format!("postgres connection closed: {err}"))
        } else {
            Self::service(format!("postgres error: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            RagError::from_status("openai", StatusCode::TOO_MANY_REQUESTS, ""),
            RagError::RateLimited(_)
        ));
        assert!(matches!(
            RagError::from_status("pinecone", StatusCode::NOT_FOUND, "no index"),
            RagError::Config(_)
        ));
        let upstream = RagError::from_status("openai", StatusCode::BAD_GATEWAY, "");
        assert!(upstream.is_retryable());
        let rejected = RagError::from_status("openai", StatusCode::BAD_REQUEST, "bad input");
        assert!(!rejected.is_retryable());
        assert!(rejected.to_string().contains("bad input"));
    }

    #[test]
    fn only_transient_errors_retry() {
        assert!(RagError::RateLimited("slow down".into()).is_retryable());
        assert!(RagError::transient("503").is_retryable());
        assert!(!RagError::NotFound("Atlantis".into()).is_retryable());
        assert!(!RagError::Config("missing key".into()).is_retryable());
        assert!(!RagError::Validation("empty".into()).is_retryable());
    }
}
