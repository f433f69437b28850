//! Error types for chat completion providers
//!
//! Distinguishes transient failures (network, rate limits, server errors)
//! from permanent ones (auth, malformed requests) so the retry loop and the
//! user-facing apology messages can react to each class differently.

use thiserror::Error;

/// Errors returned by chat completion providers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network-level failure (DNS, connection refused, TLS)
    #[error("Network error: {message}")]
    Network {
        /// Transport error description
        message: String,
    },

    /// Request exceeded the client timeout
    #[error("Request timed out: {message}")]
    Timeout {
        /// Timeout description
        message: String,
    },

    /// API key rejected (HTTP 401/403)
    #[error("Authentication failed: {message}")]
    Auth {
        /// Error message from the API
        message: String,
    },

    /// Rate limit hit (HTTP 429)
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Error message from the API
        message: String,
        /// Seconds to wait, taken from the Retry-After header when present
        retry_after: Option<u64>,
    },

    /// Request rejected by the API (HTTP 4xx other than 401/403/429)
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message from the API
        message: String,
    },

    /// Unexpected status from the API (5xx and anything unclassified)
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message or response body excerpt
        message: String,
    },

    /// Completion arrived with no choices to read a reply from
    #[error("Empty response received")]
    EmptyResponse,

    /// Failed to serialize the request or parse the response body
    #[error("Serialization error: {message}")]
    Serialization {
        /// Underlying serde error description
        message: String,
    },

    /// Provider is misconfigured (missing API key, bad base URL)
    #[error("Provider configuration error: {message}")]
    Config {
        /// What is missing or malformed
        message: String,
    },
}

impl ProviderError {
    /// Creates a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Creates a rate limit error
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates an API error with a status code
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if retrying the request may succeed
    ///
    /// Rate limits, timeouts, transport failures and server-side errors are
    /// retryable. Auth and request-shape errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimit { .. } => true,
            Self::Api { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Returns true if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Returns true if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Returns the suggested wait in seconds for rate limit errors
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Serialization {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = ProviderError::auth("invalid API key");
        assert_eq!(err.to_string(), "Authentication failed: invalid API key");

        let err = ProviderError::api(502, "bad gateway");
        assert_eq!(err.to_string(), "API error (status 502): bad gateway");

        assert_eq!(
            ProviderError::EmptyResponse.to_string(),
            "Empty response received"
        );
    }

    #[test]
    fn test_rate_limit_display_and_retry_after() {
        let err = ProviderError::rate_limit("too many requests", Some(30));
        assert_eq!(err.to_string(), "Rate limit exceeded: too many requests");
        assert_eq!(err.retry_after(), Some(30));

        let err = ProviderError::rate_limit("too many requests", None);
        assert_eq!(err.retry_after(), None);

        let err = ProviderError::network("down");
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::network("reset").is_retryable());
        assert!(ProviderError::timeout("30s elapsed").is_retryable());
        assert!(ProviderError::rate_limit("slow down", None).is_retryable());
        assert!(ProviderError::api(500, "internal").is_retryable());
        assert!(ProviderError::api(503, "unavailable").is_retryable());

        assert!(!ProviderError::api(404, "not found").is_retryable());
        assert!(!ProviderError::auth("bad key").is_retryable());
        assert!(!ProviderError::invalid_request("bad model").is_retryable());
        assert!(!ProviderError::EmptyResponse.is_retryable());
        assert!(!ProviderError::config("no key").is_retryable());
    }

    #[test]
    fn test_error_predicates() {
        assert!(ProviderError::rate_limit("x", None).is_rate_limit());
        assert!(!ProviderError::network("x").is_rate_limit());

        assert!(ProviderError::auth("x").is_auth_error());
        assert!(!ProviderError::rate_limit("x", None).is_auth_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ProviderError = json_err.into();
        assert!(matches!(err, ProviderError::Serialization { .. }));
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = ProviderError::rate_limit("limit", Some(5));
        let cloned = err.clone();
        assert_eq!(err, cloned);
        assert_eq!(cloned.retry_after(), Some(5));
    }
}
