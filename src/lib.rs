//! # bid-review-link
//!
//! Client library for the bid-review API.
//!
//! Two independent pieces:
//!
//! - [`BidReviewClient`]: the HTTP transport. Attaches the stored access token
//!   to every request and, on HTTP 401, clears credentials and redirects to the
//!   login route before handing the error back.
//! - [`EventHub`]: one realtime WebSocket channel with typed, per-event
//!   listeners, reconnection and keepalive. [`LiveBids`] and
//!   [`LiveCustomers`] fold its domain events into ordered collections.
//!
//! Credentials live behind [`KeyValueStore`] and the redirect behind
//! [`Navigator`], so both can be swapped out in tests or in a different host.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bid_review_link::{BidReviewClient, EventHub, LinkConfig, LiveBids};
//!
//! # async fn example() -> bid_review_link::Result<()> {
//! let config = LinkConfig::from_env();
//! let client = BidReviewClient::builder().config(&config).build()?;
//! client.login("alice@example.com", "secret").await?;
//!
//! let hub = EventHub::builder()
//!     .config(&config)
//!     .token_storage(client.tokens().clone())
//!     .build()?;
//!
//! let bids = LiveBids::attach(&hub);
//! bids.seed(client.bids().list().await?);
//! hub.connect()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event_handlers;
pub mod hub;
pub mod interceptor;
pub mod live;
pub mod models;
pub mod navigator;
pub mod resources;
pub mod storage;
pub mod timeouts;

pub use client::{BidReviewClient, BidReviewClientBuilder};
pub use config::LinkConfig;
pub use error::{BidLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason};
pub use hub::{
    ConnectionState, EventHub, EventHubBuilder, EventKind, HubEvent, InboundMessage, ListenerId,
    Subscription,
};
pub use interceptor::{
    AuthFailureInterceptor, BearerTokenInterceptor, RequestInterceptor, ResponseInterceptor,
};
pub use live::{
    BidReducer, CustomerReducer, EntityCollection, Identified, LiveBids, LiveCollection,
    LiveCustomers, Reducer,
};
pub use models::{
    Bid, BidStatus, ConnectionOptions, Customer, Dashboard, DomainEvent, EntityRef, ListResponse,
    LoginResponse, MessageResponse, Milestone, RegisterRequest, RegisteredUser, Review,
    ReviewCompletion, StatusChange, UserInfo,
};
pub use navigator::{ChannelNavigator, LogNavigator, Navigator};
pub use resources::{Resource, ResourceApi};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenPair, TokenStorage};
pub use timeouts::LinkTimeouts;
