//! Error types for bid-review-link.

use thiserror::Error;

/// Errors surfaced by the transport client and the realtime event hub.
#[derive(Error, Debug)]
pub enum BidLinkError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The outgoing request could not be built (bad URL, bad header value, ...).
    #[error("Request error: {0}")]
    RequestError(String),

    /// Transport-level failure with no HTTP response attached.
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// The server answered with a non-success status.
    #[error("Server error ({status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BidLinkError {
    /// HTTP status carried by the error, if the server produced a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// `true` for an HTTP 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }
}

impl From<reqwest::Error> for BidLinkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::ServerError {
                status_code: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else if err.is_builder() {
            Self::RequestError(err.to_string())
        } else if err.is_decode() {
            Self::SerializationError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BidLinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for bid-review-link operations
pub type Result<T> = std::result::Result<T, BidLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_only_for_server_errors() {
        let err = BidLinkError::ServerError {
            status_code: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.status_code(), Some(401));
        assert!(err.is_unauthorized());

        let err = BidLinkError::NetworkError("connection refused".to_string());
        assert_eq!(err.status_code(), None);
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: BidLinkError = parse.unwrap_err().into();
        assert!(matches!(err, BidLinkError::SerializationError(_)));
    }

    #[test]
    fn test_display_includes_status() {
        let err = BidLinkError::ServerError {
            status_code: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (503): unavailable");
    }
}
