//! Payloads of the realtime connection lifecycle events.
//!
//! [`DisconnectReason`] travels with [`HubEvent::Disconnected`] and
//! [`ConnectionError`] with [`HubEvent::Error`].
//!
//! [`HubEvent::Disconnected`]: crate::hub::HubEvent::Disconnected
//! [`HubEvent::Error`]: crate::hub::HubEvent::Error

use std::fmt;

/// Why the realtime channel closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// Close reason text, or a local description such as `Pong timeout`.
    pub message: String,
    /// Close code from the server's close frame, when it sent one.
    pub code: Option<u16>,
}

impl DisconnectReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Reason used when the application itself called `disconnect()`.
    pub fn client_requested() -> Self {
        Self::new("Client disconnected")
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code: {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Failure detail passed to `error` listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub message: String,
    /// `false` when retrying cannot help (rejected credentials, attempts exhausted).
    pub recoverable: bool,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
