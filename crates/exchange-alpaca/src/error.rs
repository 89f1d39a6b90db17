//! Error types for the Alpaca brokerage integration.
//!
//! Provides typed errors for authentication, API communication, request
//! validation, and option symbol decoding.

use thiserror::Error;

/// Errors that can occur when interacting with the brokerage.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Credentials missing or refused.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Request rejected locally before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The order ID that was not found.
        order_id: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BrokerError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Creates an order not found error.
    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::OrderNotFound {
            order_id: order_id.into(),
        }
    }

    /// Returns true if the error indicates the request should be retried later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for brokerage operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Failure to decode an OCC option symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolParseError {
    /// Symbol does not match `ROOT YYMMDD C|P STRIKE8`.
    #[error("not an OCC option symbol: {0}")]
    Format(String),

    /// Date digits do not form a calendar date.
    #[error("invalid expiration in option symbol: {0}")]
    InvalidDate(String),

    /// Strike digits could not be scaled.
    #[error("invalid strike in option symbol: {0}")]
    InvalidStrike(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Error Construction Tests ====================

    #[test]
    fn test_api_error_construction() {
        let err = BrokerError::api(422, "qty must be > 0");
        assert!(matches!(
            err,
            BrokerError::Api {
                status_code: 422,
                ..
            }
        ));
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("qty must be > 0"));
    }

    #[test]
    fn test_order_not_found_error() {
        let err = BrokerError::order_not_found("61e69015-8549-4bfd");
        assert!(err.to_string().contains("61e69015-8549-4bfd"));
    }

    // ==================== Transient Tests ====================

    #[test]
    fn test_network_timeout_and_rate_limit_are_transient() {
        assert!(BrokerError::Network("reset".into()).is_transient());
        assert!(BrokerError::Timeout("slow".into()).is_transient());
        assert!(BrokerError::rate_limit(30).is_transient());
    }

    #[test]
    fn test_server_error_is_transient_client_error_is_not() {
        assert!(BrokerError::api(503, "unavailable").is_transient());
        assert!(!BrokerError::api(403, "forbidden").is_transient());
        assert!(!BrokerError::order_not_found("x").is_transient());
    }

    #[test]
    fn test_auth_error_is_not_transient() {
        let err = BrokerError::Authentication("missing key".into());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_symbol_parse_error_display() {
        let err = SymbolParseError::Format("SPY".into());
        assert!(err.to_string().contains("SPY"));
    }
}
