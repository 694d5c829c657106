//! Realtime event hub.
//!
//! - [`event`]: connection state and the typed events listeners receive
//! - [`registry`]: listener bookkeeping and the [`Subscription`] guard
//! - [`websocket`]: handshake request, authentication and connect helpers
//! - [`event_hub`]: the [`EventHub`] handle and its background session task

pub mod event;
pub mod event_hub;
pub mod registry;
pub(crate) mod websocket;

pub use event::{ConnectionState, EventKind, HubEvent, InboundMessage};
pub use event_hub::{EventHub, EventHubBuilder};
pub use registry::{Listener, ListenerId, ListenerRegistry, Subscription};
