//! Transport client for the bid-review REST API.
//!
//! Every call runs through the interceptor pipeline described in
//! [`crate::interceptor`]: the stored access token is attached on the way out
//! and a 401 on the way back clears credentials and redirects to the login
//! route before the error reaches the caller.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{normalize_base_url, LinkConfig, DEFAULT_LOGIN_ROUTE};
use crate::error::{BidLinkError, Result};
use crate::interceptor::{
    AuthFailureInterceptor, BearerTokenInterceptor, InterceptorChain, RequestInterceptor,
    ResponseInterceptor,
};
use crate::models::{
    Bid, Customer, Dashboard, LoginRequest, LoginResponse, Milestone, RefreshRequest,
    RefreshResponse, RegisterRequest, RegisteredUser, Review,
};
use crate::navigator::{LogNavigator, Navigator};
use crate::resources::ResourceApi;
use crate::storage::{KeyValueStore, TokenPair, TokenStorage};
use crate::timeouts::LinkTimeouts;

const LOGIN_PATH: &str = "auth/login/";
const LOGOUT_PATH: &str = "auth/logout/";
const TOKEN_REFRESH_PATH: &str = "auth/token/refresh/";
const REGISTER_PATH: &str = "auth/register/";
const DASHBOARD_PATH: &str = "bids/dashboard/";

/// Bid-review API client.
///
/// Cheap to clone; clones share the HTTP connection pool, the interceptor
/// chain and the credential store.
///
/// # Examples
///
/// ```rust,no_run
/// use bid_review_link::{BidReviewClient, LinkConfig};
///
/// # async fn example() -> bid_review_link::Result<()> {
/// let client = BidReviewClient::builder()
///     .config(&LinkConfig::from_env())
///     .build()?;
///
/// client.login("alice@example.com", "secret").await?;
/// for bid in client.bids().list().await? {
///     println!("{} {}", bid.code, bid.status);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BidReviewClient {
    base_url: String,
    http_client: reqwest::Client,
    interceptors: InterceptorChain,
    tokens: TokenStorage,
    login_route: String,
    timeouts: LinkTimeouts,
}

impl std::fmt::Debug for BidReviewClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BidReviewClient")
            .field("base_url", &self.base_url)
            .field("login_route", &self.login_route)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl BidReviewClient {
    pub fn builder() -> BidReviewClientBuilder {
        BidReviewClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn timeouts(&self) -> &LinkTimeouts {
        &self.timeouts
    }

    /// Credential store shared with the interceptors. Hand a clone to
    /// `EventHubBuilder::token_storage` to authenticate the realtime channel.
    pub fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }

    /// Absolute URL for `path`. Absolute URLs (pagination links) pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Run one request through the full pipeline.
    ///
    /// Construction and request-interceptor failures are returned as they
    /// are. Transport failures and non-2xx statuses pass through every
    /// response interceptor's `on_error` first; 2xx responses pass through
    /// `on_response`.
    pub async fn send<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.http_client.request(method.clone(), url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut request = builder.build()?;
        self.interceptors.apply_request(&mut request)?;

        debug!("[LINK_HTTP] Sending {} to {}", method, url);
        let start = Instant::now();
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[LINK_HTTP] {} {} failed: {}", method, url, e);
                return Err(self.interceptors.apply_error(e.into()));
            },
        };

        let status = response.status();
        debug!(
            "[LINK_HTTP] Response received: status={} duration_ms={}",
            status,
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(
                "[LINK_HTTP] Server error: status={} message=\"{}\"",
                status.as_u16(),
                message
            );
            let error = BidLinkError::ServerError {
                status_code: status.as_u16(),
                message,
            };
            return Err(self.interceptors.apply_error(error));
        }

        self.interceptors.apply_response(response)
    }

    async fn request_json<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, url, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json::<(), T>(Method::GET, &self.url_for(path), None)
            .await
    }

    /// GET with query parameters appended to `path`.
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = reqwest::Url::parse(&self.url_for(path))
            .map_err(|e| BidLinkError::RequestError(format!("Invalid URL: {}", e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        self.request_json::<(), T>(Method::GET, url.as_str(), None)
            .await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, &self.url_for(path), Some(body))
            .await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::PUT, &self.url_for(path), Some(body))
            .await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::PATCH, &self.url_for(path), Some(body))
            .await
    }

    /// DELETE; any response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, &self.url_for(path), None)
            .await?;
        Ok(())
    }

    /// Authenticate and store the returned token pair, replacing any
    /// previous one.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        debug!("[LOGIN] Authenticating '{}'", email);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = match self.post_json(LOGIN_PATH, &request).await {
            Ok(response) => response,
            Err(BidLinkError::ServerError {
                status_code: status_code @ (400 | 401),
                message,
            }) => {
                return Err(BidLinkError::AuthenticationError(format!(
                    "Login failed ({}): {}",
                    status_code, message
                )));
            },
            Err(e) => return Err(e),
        };

        self.tokens
            .save(&TokenPair::new(response.access.clone(), response.refresh.clone()))?;
        log::info!("[LOGIN] Authenticated as '{}'", response.user.email);
        Ok(response)
    }

    /// Create an account. Stored credentials are left untouched; call
    /// [`login`](Self::login) afterwards to obtain tokens.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser> {
        debug!("[LOGIN] Registering '{}'", request.email);
        let user: RegisteredUser = self.post_json(REGISTER_PATH, request).await?;
        log::info!("[LOGIN] Registered '{}'", user.email);
        Ok(user)
    }

    /// Exchange the stored refresh token for a new access token and store it.
    /// Returns the new access token.
    pub async fn refresh_access_token(&self) -> Result<String> {
        let refresh = self.tokens.refresh_token()?.ok_or_else(|| {
            BidLinkError::AuthenticationError("No refresh token stored".to_string())
        })?;

        let response: RefreshResponse = self
            .post_json(TOKEN_REFRESH_PATH, &RefreshRequest { refresh })
            .await?;

        match response.refresh {
            Some(rotated) => self
                .tokens
                .save(&TokenPair::new(response.access.clone(), rotated))?,
            None => self.tokens.update_access_token(&response.access)?,
        }
        debug!("[LOGIN] Access token refreshed");
        Ok(response.access)
    }

    /// Revoke the refresh token on the server and clear local credentials.
    ///
    /// The server call is best effort; credentials are cleared whatever it
    /// returns.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.tokens.refresh_token()? {
            let result = self
                .send(
                    Method::POST,
                    &self.url_for(LOGOUT_PATH),
                    Some(&RefreshRequest { refresh }),
                )
                .await;
            if let Err(e) = result {
                warn!("[LOGIN] Server-side logout failed: {}", e);
            }
        }
        self.tokens.clear()
    }

    /// Whether an access token is stored.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.tokens.access_token(), Ok(Some(token)) if !token.is_empty())
    }

    /// Bid counts, totals and upcoming deadlines for the dashboard view.
    pub async fn dashboard(&self) -> Result<Dashboard> {
        self.get_json(DASHBOARD_PATH).await
    }

    pub fn bids(&self) -> ResourceApi<'_, Bid> {
        ResourceApi::new(self)
    }

    pub fn customers(&self) -> ResourceApi<'_, Customer> {
        ResourceApi::new(self)
    }

    pub fn milestones(&self) -> ResourceApi<'_, Milestone> {
        ResourceApi::new(self)
    }

    pub fn reviews(&self) -> ResourceApi<'_, Review> {
        ResourceApi::new(self)
    }
}

/// Pull a readable message out of an error body: `detail`, `error` or
/// `message` from a JSON object, else the raw text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(serde_json::Value::String(message)) = map.get(key) {
                return Some(message.clone());
            }
        }
    }
    Some(body.to_string())
}

/// Builder for configuring [`BidReviewClient`] instances.
pub struct BidReviewClientBuilder {
    base_url: Option<String>,
    login_route: String,
    timeouts: LinkTimeouts,
    tokens: Option<TokenStorage>,
    navigator: Option<Arc<dyn Navigator>>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Default for BidReviewClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BidReviewClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            timeouts: LinkTimeouts::default(),
            tokens: None,
            navigator: None,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Set the API base URL, e.g. `http://localhost:8000/api`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Take base URL and login route from a [`LinkConfig`].
    pub fn config(mut self, config: &LinkConfig) -> Self {
        self.base_url = Some(config.api_base_url.clone());
        self.login_route = config.login_route.clone();
        self
    }

    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Persist credentials in `store`. Defaults to an in-memory store.
    pub fn token_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.tokens = Some(TokenStorage::new(store));
        self
    }

    pub fn token_storage(mut self, tokens: TokenStorage) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Where the login redirect goes. Defaults to [`LogNavigator`].
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Add a request interceptor; it runs after the bearer-token one.
    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Add a response interceptor; it runs after the 401 handler.
    pub fn response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Result<BidReviewClient> {
        let base_url = self
            .base_url
            .map(|url| normalize_base_url(&url))
            .ok_or_else(|| BidLinkError::ConfigurationError("base_url is required".into()))?;
        reqwest::Url::parse(&base_url).map_err(|e| {
            BidLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut client_builder = reqwest::Client::builder()
            .default_headers(headers)
            .pool_idle_timeout(std::time::Duration::from_secs(90));
        if !LinkTimeouts::is_no_timeout(self.timeouts.request_timeout) {
            client_builder = client_builder.timeout(self.timeouts.request_timeout);
        }
        if !LinkTimeouts::is_no_timeout(self.timeouts.connection_timeout) {
            client_builder = client_builder.connect_timeout(self.timeouts.connection_timeout);
        }
        let http_client = client_builder
            .build()
            .map_err(|e| BidLinkError::ConfigurationError(e.to_string()))?;

        let tokens = self.tokens.unwrap_or_else(TokenStorage::in_memory);
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(LogNavigator) as Arc<dyn Navigator>);

        let mut interceptors = InterceptorChain::new();
        interceptors.push_request(Arc::new(BearerTokenInterceptor::new(tokens.clone())));
        for interceptor in self.request_interceptors {
            interceptors.push_request(interceptor);
        }
        interceptors.push_response(Arc::new(AuthFailureInterceptor::new(
            tokens.clone(),
            navigator,
            self.login_route.clone(),
        )));
        for interceptor in self.response_interceptors {
            interceptors.push_response(interceptor);
        }

        debug!("[bid-link] Client ready for {}", base_url);
        Ok(BidReviewClient {
            base_url,
            http_client,
            interceptors,
            tokens,
            login_route: self.login_route,
            timeouts: self.timeouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let result = BidReviewClient::builder()
            .base_url("http://localhost:8000/api/")
            .timeouts(LinkTimeouts::fast())
            .login_route("/signin")
            .build();

        let client = result.unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.login_route(), "/signin");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_builder_missing_url() {
        let err = BidReviewClient::builder().build().unwrap_err();
        assert!(matches!(err, BidLinkError::ConfigurationError(_)));
    }

    #[test]
    fn test_builder_invalid_url() {
        let err = BidReviewClient::builder()
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, BidLinkError::ConfigurationError(_)));
    }

    #[test]
    fn test_builder_from_config() {
        let config = LinkConfig::new("https://bids.example.com/api").with_login_route("/auth");
        let client = BidReviewClient::builder().config(&config).build().unwrap();
        assert_eq!(client.base_url(), "https://bids.example.com/api");
        assert_eq!(client.login_route(), "/auth");
    }

    #[test]
    fn test_url_for_joins_paths() {
        let client = BidReviewClient::builder()
            .base_url("http://localhost:8000/api")
            .build()
            .unwrap();
        assert_eq!(client.url_for("bids/"), "http://localhost:8000/api/bids/");
        assert_eq!(client.url_for("/bids/1/"), "http://localhost:8000/api/bids/1/");
        assert_eq!(
            client.url_for("http://localhost:8000/api/bids/?page=2"),
            "http://localhost:8000/api/bids/?page=2"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"detail": "Given token not valid"}"#).as_deref(),
            Some("Given token not valid")
        );
        assert_eq!(error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message("  "), None);
    }

    #[test]
    fn test_is_authenticated_reflects_store() {
        let tokens = TokenStorage::in_memory();
        let client = BidReviewClient::builder()
            .base_url("http://localhost:8000/api")
            .token_storage(tokens.clone())
            .build()
            .unwrap();
        assert!(!client.is_authenticated());

        tokens.save(&TokenPair::new("a", "r")).unwrap();
        assert!(client.is_authenticated());
    }
}
