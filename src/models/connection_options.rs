use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection-level options for the realtime event hub.
///
/// Controls automatic reconnection and how the access token travels with the
/// WebSocket handshake.
///
/// # Example
///
/// ```rust
/// use bid_review_link::ConnectionOptions;
///
/// // Give up after five failed attempts, starting at half a second.
/// let options = ConnectionOptions::new()
///     .with_reconnect_delay_ms(500)
///     .with_max_reconnect_attempts(Some(5));
/// assert!(options.auto_reconnect);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Reopen the channel after it drops
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Backoff before the first reconnect, in milliseconds
    /// Default: 1000ms. Doubles per attempt up to max_reconnect_delay_ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Maximum delay between reconnection attempts
    /// Default: 30000ms
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Failed attempts allowed before the hub stays in `error`
    /// Default: None (infinite retries). Some(0) disables reconnection
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    /// Send the access token as a `token` query parameter instead of an
    /// `Authorization` header. Needed by servers that only see the URL of the
    /// upgrade request.
    /// Default: false
    #[serde(default)]
    pub token_in_query: bool,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30000,
            max_reconnect_attempts: None,
            token_in_query: false,
        }
    }
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// `None` retries forever; `Some(0)` never retries
    pub fn with_max_reconnect_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn with_token_in_query(mut self, enabled: bool) -> Self {
        self.token_in_query = enabled;
        self
    }

    /// Backoff before reconnection attempt number `attempt` (0-based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let delay = std::cmp::min(
            self.reconnect_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt)),
            self.max_reconnect_delay_ms,
        );
        Duration::from_millis(delay)
    }

    /// Whether another attempt is allowed after `attempts` failed ones.
    pub fn may_reconnect(&self, attempts: u32) -> bool {
        self.auto_reconnect && self.max_reconnect_attempts.map_or(true, |max| attempts < max)
    }
}
