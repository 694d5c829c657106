//! Low-level WebSocket helpers: handshake request, authentication, connect.

use std::time::Duration;

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};

use crate::error::{BidLinkError, Result};
use crate::models::ConnectionOptions;
use crate::storage::TokenStorage;
use crate::timeouts::LinkTimeouts;

pub(crate) type WebSocketStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A duration far enough in the future (~100 years) to act as "never" for
/// deadline calculations without overflowing `Instant::now() + dur`.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Inbound text frames above this size are dropped (16 MiB).
pub(crate) const MAX_FRAME_BYTES: usize = 16 << 20;

/// Validate a realtime endpoint URL. Only `ws` and `wss` are accepted.
pub(crate) fn validate_ws_url(ws_url: &str) -> Result<reqwest::Url> {
    let url = reqwest::Url::parse(ws_url).map_err(|e| {
        BidLinkError::ConfigurationError(format!("Invalid WebSocket URL '{}': {}", ws_url, e))
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(BidLinkError::ConfigurationError(format!(
            "WebSocket URL must use ws:// or wss://, got '{}://'",
            other
        ))),
    }
}

/// Build the upgrade request, attaching the access token when one is stored.
///
/// The token goes into an `Authorization: Bearer` header, or into a `token`
/// query parameter when `options.token_in_query` is set. A failing token
/// store fails the request.
pub(crate) fn build_ws_request(
    ws_url: &str,
    tokens: Option<&TokenStorage>,
    options: &ConnectionOptions,
) -> Result<Request> {
    let mut url = validate_ws_url(ws_url)?;

    let token = match tokens {
        Some(tokens) => tokens.access_token()?,
        None => None,
    };

    if options.token_in_query {
        if let Some(ref token) = token {
            url.query_pairs_mut().append_pair("token", token);
        }
    }

    let mut request = url.as_str().into_client_request().map_err(|e| {
        BidLinkError::WebSocketError(format!("Failed to build WebSocket request: {}", e))
    })?;

    if !options.token_in_query {
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                BidLinkError::RequestError(format!("Invalid access token header: {}", e))
            })?;
            value.set_sensitive(true);
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }
    }

    Ok(request)
}

/// Open the channel, bounded by the connection timeout.
///
/// HTTP 401/403 during the upgrade map to [`BidLinkError::AuthenticationError`],
/// which the hub treats as not recoverable by retrying.
pub(crate) async fn connect_ws(
    ws_url: &str,
    tokens: Option<&TokenStorage>,
    options: &ConnectionOptions,
    timeouts: &LinkTimeouts,
) -> Result<WebSocketStream> {
    log::debug!("[HUB] Establishing WebSocket connection to {}", ws_url);
    let request = build_ws_request(ws_url, tokens, options)?;

    let connect_result = if !LinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
        tokio::time::timeout(
            timeouts.connection_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
    } else {
        Ok(tokio_tungstenite::connect_async(request).await)
    };

    match connect_result {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(tokio_tungstenite::tungstenite::Error::Http(response))) => {
            let status = response.status().as_u16();
            Err(match status {
                401 => BidLinkError::AuthenticationError(
                    "Unauthorized: WebSocket requires valid credentials".to_string(),
                ),
                403 => BidLinkError::AuthenticationError(
                    "Forbidden: Access to WebSocket denied".to_string(),
                ),
                code => BidLinkError::WebSocketError(format!("WebSocket HTTP error: {}", code)),
            })
        },
        Ok(Err(e)) => Err(BidLinkError::WebSocketError(format!("Connection failed: {}", e))),
        Err(_) => Err(BidLinkError::TimeoutError(format!(
            "Connection timeout ({:?})",
            timeouts.connection_timeout
        ))),
    }
}
