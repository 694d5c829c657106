//! Client configuration resolved from the environment.
//!
//! The API base URL, realtime URL and login route are fixed when the client
//! boots. Each one can be overridden through an environment variable and
//! otherwise falls back to a local development default.

use serde::{Deserialize, Serialize};

/// Environment variable holding the REST API base URL.
pub const ENV_API_URL: &str = "BID_REVIEW_API_URL";

/// Environment variable holding the realtime (WebSocket) URL.
pub const ENV_WS_URL: &str = "BID_REVIEW_WS_URL";

/// Environment variable holding the route to navigate to on auth failure.
pub const ENV_LOGIN_ROUTE: &str = "BID_REVIEW_LOGIN_ROUTE";

/// Local development API endpoint used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Path of the realtime endpoint relative to the server root.
pub const DEFAULT_WS_PATH: &str = "/ws/updates/";

/// Route the client navigates to after an authentication failure.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Boot-time configuration shared by the transport client and the event hub.
///
/// # Example
///
/// ```rust
/// use bid_review_link::LinkConfig;
///
/// let config = LinkConfig::new("https://bids.example.com/api");
/// assert_eq!(config.ws_url, "wss://bids.example.com/ws/updates/");
/// assert_eq!(config.login_route, "/login");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// REST API base URL, e.g. `http://localhost:8000/api`
    pub api_base_url: String,

    /// Realtime channel URL, e.g. `ws://localhost:8000/ws/updates/`
    pub ws_url: String,

    /// Route passed to the navigator when a request returns 401
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

fn default_login_route() -> String {
    DEFAULT_LOGIN_ROUTE.to_string()
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl LinkConfig {
    /// Build a configuration from an API base URL, deriving the realtime URL.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url = normalize_base_url(&api_base_url.into());
        let ws_url = derive_ws_url(&api_base_url);
        Self {
            api_base_url,
            ws_url,
            login_route: default_login_route(),
        }
    }

    /// Resolve the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = match get(ENV_API_URL) {
            Some(url) => Self::new(url),
            None => {
                log::debug!(
                    "[bid-link] {} not set, falling back to {}",
                    ENV_API_URL,
                    DEFAULT_API_URL
                );
                Self::default()
            },
        };
        if let Some(ws_url) = get(ENV_WS_URL) {
            config.ws_url = ws_url;
        }
        if let Some(route) = get(ENV_LOGIN_ROUTE) {
            config.login_route = route;
        }
        config
    }

    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }
}

/// Strip trailing slashes so paths can be joined with a single `/`.
pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// `http(s)://host[:port]/anything` -> `ws(s)://host[:port]/ws/updates/`
pub(crate) fn derive_ws_url(api_base_url: &str) -> String {
    let (scheme, rest) = if let Some(rest) = api_base_url.strip_prefix("https://") {
        ("wss://", rest)
    } else if let Some(rest) = api_base_url.strip_prefix("http://") {
        ("ws://", rest)
    } else if let Some(rest) = api_base_url.strip_prefix("wss://") {
        ("wss://", rest)
    } else if let Some(rest) = api_base_url.strip_prefix("ws://") {
        ("ws://", rest)
    } else {
        ("ws://", api_base_url)
    };
    let authority = rest.split('/').next().unwrap_or(rest);
    format!("{}{}{}", scheme, authority, DEFAULT_WS_PATH)
}
