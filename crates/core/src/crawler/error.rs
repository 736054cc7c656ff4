//! Fetch error taxonomy for the crawl pipeline.
//!
//! The kind is decided at the point of detection (status code or transport
//! failure), so retry decisions never inspect error message text.

use reqwest::StatusCode;
use thiserror::Error;

/// Classified failure of a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429. Always retryable with backoff.
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    /// Network-level failures and 5xx responses. Retryable with backoff.
    #[error("transient error: {0}")]
    Transient(String),

    /// Schema violations and non-429 4xx responses. Never retried.
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl FetchError {
    /// Whether the worker pool should retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited | FetchError::Transient(_))
    }

    /// Classify a non-success HTTP status.
    ///
    /// Returns `None` for success statuses.
    pub fn classify_status(status: StatusCode) -> Option<FetchError> {
        if status.is_success() {
            return None;
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Some(FetchError::RateLimited);
        }
        if status.is_server_error() {
            return Some(FetchError::Transient(format!("HTTP {}", status.as_u16())));
        }
        Some(FetchError::Fatal(format!("HTTP {}", status.as_u16())))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            // Body did not match the expected schema
            FetchError::Fatal(format!("response decoding failed: {}", e))
        } else {
            FetchError::Transient(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(FetchError::classify_status(StatusCode::OK).is_none());
        assert!(matches!(
            FetchError::classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchError::RateLimited)
        ));
        assert!(matches!(
            FetchError::classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(FetchError::Transient(_))
        ));
        assert!(matches!(
            FetchError::classify_status(StatusCode::BAD_GATEWAY),
            Some(FetchError::Transient(_))
        ));
        assert!(matches!(
            FetchError::classify_status(StatusCode::NOT_FOUND),
            Some(FetchError::Fatal(_))
        ));
        assert!(matches!(
            FetchError::classify_status(StatusCode::FORBIDDEN),
            Some(FetchError::Fatal(_))
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(FetchError::RateLimited.is_retryable());
        assert!(FetchError::Transient("reset".to_string()).is_retryable());
        assert!(!FetchError::Fatal("bad schema".to_string()).is_retryable());
    }
}
