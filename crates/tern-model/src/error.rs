//! Error types for tern-model

use thiserror::Error;

/// Result type alias using tern-model ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur when talking to a model provider
#[derive(Error, Debug)]
pub enum ApiError {
    /// Rate limit exceeded. `retry_after` carries the server's
    /// `retry-after`/`x-ratelimit-reset` value, uninterpreted: it may be
    /// seconds-to-wait or an absolute epoch timestamp.
    #[error("rate limited (status {status})")]
    RateLimit {
        status: u16,
        retry_after: Option<f64>,
    },

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Authentication failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connection, TLS, SSE framing)
    #[error("transport error: {0}")]
    Transport(String),

    /// API returned a non-success status with a message
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Unexpected response shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Whether this error is a rate limit (HTTP 429 class)
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimit { .. } | ApiError::Status { status: 429, .. }
        )
    }

    /// Whether the retry policy should consider this error at all
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimit { .. } | ApiError::Timeout => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The server-provided retry hint, uninterpreted
    pub fn retry_after(&self) -> Option<f64> {
        match self {
            ApiError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// One-line remediation hint shown alongside the error
    pub fn hint(&self) -> &'static str {
        match self {
            ApiError::RateLimit { .. } => "wait and retry or upgrade plan",
            ApiError::Timeout => "check network connectivity and retry",
            ApiError::Auth(_) => "check your API key",
            ApiError::Transport(_) => "check network connectivity",
            ApiError::Status { .. } => "inspect the provider response",
            ApiError::UnexpectedResponse(_) => "retry; report if it persists",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        let e = ApiError::RateLimit {
            status: 429,
            retry_after: Some(2.0),
        };
        assert!(e.is_rate_limit());
        assert!(e.is_retryable());
        assert_eq!(e.retry_after(), Some(2.0));
    }

    #[test]
    fn test_status_429_is_rate_limit() {
        let e = ApiError::Status {
            status: 429,
            message: "too many requests".into(),
        };
        assert!(e.is_rate_limit());
    }

    #[test]
    fn test_auth_not_retryable() {
        let e = ApiError::Auth("bad key".into());
        assert!(!e.is_rate_limit());
        assert!(!e.is_retryable());
        assert_eq!(e.hint(), "check your API key");
    }

    #[test]
    fn test_server_errors_retryable() {
        let e = ApiError::Status {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(e.is_retryable());
        assert!(!e.is_rate_limit());
    }
}
