use thiserror::Error;

/// Application-wide error types for Fizica.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP plumbing failed (building the client, reading a body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The chat-completion API answered with a non-success status.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError { message: String, status_code: u16 },

    /// Provider refused the call because of rate limits or quota.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Caller input is incomplete or malformed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

/// Retry class of a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// HTTP 429, quota exhausted, or an explicit rate-limit signal.
    RateLimited,
    /// Connection reset, timeout, or another network-level fault.
    TransientNetwork,
    /// Anything else. Never retried.
    Other,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Other)
    }
}

/// Errors that the request throttle knows how to classify.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

impl AppError {
    /// Classify this error for the throttle's retry loop.
    ///
    /// Structured variants are classified by their tag. Variants that only
    /// carry free-form text fall back to message sniffing.
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::RateLimitExceeded(_) => ErrorClass::RateLimited,
            AppError::LlmError {
                status_code: 429, ..
            } => ErrorClass::RateLimited,
            AppError::NetworkError(_) | AppError::Timeout(_) => ErrorClass::TransientNetwork,
            AppError::LlmError { message, .. }
            | AppError::HttpError(message)
            | AppError::Generic(message) => classify_message(message),
            _ => ErrorClass::Other,
        }
    }

    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

impl Classify for AppError {
    fn class(&self) -> ErrorClass {
        AppError::class(self)
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "quota"];
const NETWORK_MARKERS: &[&str] = &["fetch failed", "etimedout", "econnreset", "network", "timeout"];

/// Message heuristics for errors that arrive without a structured signal.
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::RateLimited
    } else if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::TransientNetwork
    } else {
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_classification() {
        assert_eq!(
            AppError::RateLimitExceeded("slow down".into()).class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            AppError::LlmError {
                message: "Too many requests".into(),
                status_code: 429,
            }
            .class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            AppError::NetworkError("reset".into()).class(),
            ErrorClass::TransientNetwork
        );
        assert_eq!(AppError::Timeout(30).class(), ErrorClass::TransientNetwork);
        assert_eq!(
            AppError::ValidationError("missing problem".into()).class(),
            ErrorClass::Other
        );
    }

    #[test]
    fn test_message_fallback_classification() {
        assert_eq!(
            AppError::Generic("You exceeded your current QUOTA".into()).class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            AppError::HttpError("ECONNRESET while reading".into()).class(),
            ErrorClass::TransientNetwork
        );
        assert_eq!(
            AppError::Generic("fetch failed".into()).class(),
            ErrorClass::TransientNetwork
        );
        assert_eq!(
            AppError::LlmError {
                message: "model not found".into(),
                status_code: 404,
            }
            .class(),
            ErrorClass::Other
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::NetworkError("reset".into()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(AppError::RateLimitExceeded("429".into()).is_retryable());
        assert!(!AppError::ConfigError("no key".into()).is_retryable());
        assert!(!AppError::Generic("bad input".into()).is_retryable());
    }
}
