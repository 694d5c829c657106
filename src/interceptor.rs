//! Request/response interceptors for the transport client.
//!
//! Every outbound call runs through the same pipeline:
//!
//! 1. request interceptors, in registration order, may edit the built
//!    [`reqwest::Request`] (headers, URL) or reject it;
//! 2. the request goes to the network;
//! 3. a successful response passes through [`ResponseInterceptor::on_response`],
//!    a failed one through [`ResponseInterceptor::on_error`].
//!
//! Two interceptors are always installed first: [`BearerTokenInterceptor`]
//! and [`AuthFailureInterceptor`].

use crate::error::{BidLinkError, Result};
use crate::navigator::Navigator;
use crate::storage::TokenStorage;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;

/// Hook run on every outgoing request before it is sent.
pub trait RequestInterceptor: Send + Sync {
    /// Inspect or modify the request. Returning `Err` aborts the call and the
    /// error reaches the caller unchanged.
    fn on_request(&self, request: &mut reqwest::Request) -> Result<()>;
}

/// Hook run on every response or failure.
pub trait ResponseInterceptor: Send + Sync {
    /// Successful responses. The default is the identity.
    fn on_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        Ok(response)
    }

    /// Failed calls. Whatever is returned is what the caller receives; the
    /// default passes the error through untouched.
    fn on_error(&self, error: BidLinkError) -> BidLinkError {
        error
    }
}

/// Attaches `Authorization: Bearer <token>` when an access token is stored.
///
/// The store is read once per request. Without a token the request is left
/// exactly as it was built.
#[derive(Debug, Clone)]
pub struct BearerTokenInterceptor {
    tokens: TokenStorage,
}

impl BearerTokenInterceptor {
    pub fn new(tokens: TokenStorage) -> Self {
        Self { tokens }
    }
}

impl RequestInterceptor for BearerTokenInterceptor {
    fn on_request(&self, request: &mut reqwest::Request) -> Result<()> {
        let token = match self.tokens.access_token()? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(()),
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| BidLinkError::RequestError(format!("Invalid access token: {}", e)))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Handles authentication failures.
///
/// On HTTP 401 both tokens are cleared and the navigator is sent to the login
/// route. The error itself is still returned to the caller. Every other error,
/// including failures without a response, passes through with no side effects.
#[derive(Clone)]
pub struct AuthFailureInterceptor {
    tokens: TokenStorage,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl std::fmt::Debug for AuthFailureInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFailureInterceptor")
            .field("login_route", &self.login_route)
            .finish_non_exhaustive()
    }
}

impl AuthFailureInterceptor {
    pub fn new(
        tokens: TokenStorage,
        navigator: Arc<dyn Navigator>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            navigator,
            login_route: login_route.into(),
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }
}

impl ResponseInterceptor for AuthFailureInterceptor {
    fn on_error(&self, error: BidLinkError) -> BidLinkError {
        if !error.is_unauthorized() {
            return error;
        }

        log::info!(
            "[LINK_HTTP] 401 received, clearing credentials and redirecting to {}",
            self.login_route
        );
        if let Err(e) = self.tokens.clear() {
            log::warn!("[LINK_HTTP] Failed to clear credentials after 401: {}", e);
        }
        self.navigator.navigate(&self.login_route);
        error
    }
}

/// Ordered interceptor pipeline owned by the client.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    request: Vec<Arc<dyn RequestInterceptor>>,
    response: Vec<Arc<dyn ResponseInterceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .finish()
    }
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_request(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
        self.request.push(interceptor);
    }

    pub fn push_response(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
        self.response.push(interceptor);
    }

    pub fn apply_request(&self, request: &mut reqwest::Request) -> Result<()> {
        for interceptor in &self.request {
            interceptor.on_request(request)?;
        }
        Ok(())
    }

    pub fn apply_response(&self, mut response: reqwest::Response) -> Result<reqwest::Response> {
        for interceptor in &self.response {
            response = interceptor.on_response(response)?;
        }
        Ok(response)
    }

    pub fn apply_error(&self, mut error: BidLinkError) -> BidLinkError {
        for interceptor in &self.response {
            error = interceptor.on_error(error);
        }
        error
    }
}
