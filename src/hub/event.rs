//! Typed events delivered by the [`EventHub`](super::EventHub).

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::event_handlers::{ConnectionError, DisconnectReason};
use crate::models::{DomainEvent, InboundFrame};

/// State of the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    /// `true` while a channel is open or being opened.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Any inbound frame, parsed but not interpreted.
///
/// Frames shaped as `{"type": name, "data": payload}` carry their name and
/// payload. Any other JSON value arrives with `event: None` and the whole
/// value as `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Event name declared by the frame, if it declares one
    pub event: Option<String>,
    /// Frame payload (`null` when a named frame has none)
    pub data: JsonValue,
}

impl InboundMessage {
    pub fn from_value(value: JsonValue) -> Self {
        match InboundFrame::deserialize(&value) {
            Ok(frame) => Self {
                event: Some(frame.event),
                data: frame.data,
            },
            Err(_) => Self {
                event: None,
                data: value,
            },
        }
    }

    /// The domain event this message carries, if its name is a known one.
    pub fn decode_domain(&self) -> Option<Result<DomainEvent, serde_json::Error>> {
        DomainEvent::decode(self.event.as_deref()?, &self.data)
    }
}

impl From<InboundFrame> for InboundMessage {
    fn from(frame: InboundFrame) -> Self {
        Self {
            event: Some(frame.event),
            data: frame.data,
        }
    }
}

/// Everything a hub listener can observe.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// The channel finished its handshake.
    Connected,
    /// The channel closed, on request or otherwise.
    Disconnected(DisconnectReason),
    /// Connecting or reading failed.
    Error(ConnectionError),
    /// Every inbound frame, whatever its event name.
    Message(InboundMessage),
    /// Inbound frames that decode into a known domain event.
    Domain(DomainEvent),
}

impl HubEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HubEvent::Connected => EventKind::Connected,
            HubEvent::Disconnected(_) => EventKind::Disconnected,
            HubEvent::Error(_) => EventKind::Error,
            HubEvent::Message(_) => EventKind::Message,
            HubEvent::Domain(event) => EventKind::from(event),
        }
    }

    pub fn as_domain(&self) -> Option<&DomainEvent> {
        match self {
            HubEvent::Domain(event) => Some(event),
            _ => None,
        }
    }
}

/// Subscription key: the discriminant of [`HubEvent`] with domain events
/// expanded to their individual names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    Message,
    BidCreated,
    BidUpdated,
    BidDeleted,
    BidStatusChanged,
    CustomerCreated,
    CustomerUpdated,
    CustomerDeleted,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Error,
        EventKind::Message,
        EventKind::BidCreated,
        EventKind::BidUpdated,
        EventKind::BidDeleted,
        EventKind::BidStatusChanged,
        EventKind::CustomerCreated,
        EventKind::CustomerUpdated,
        EventKind::CustomerDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Error => "error",
            EventKind::Message => "message",
            EventKind::BidCreated => "bid_created",
            EventKind::BidUpdated => "bid_updated",
            EventKind::BidDeleted => "bid_deleted",
            EventKind::BidStatusChanged => "bid_status_changed",
            EventKind::CustomerCreated => "customer_created",
            EventKind::CustomerUpdated => "customer_updated",
            EventKind::CustomerDeleted => "customer_deleted",
        }
    }

    /// Look a kind up by its event name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl From<&DomainEvent> for EventKind {
    fn from(event: &DomainEvent) -> Self {
        match event {
            DomainEvent::BidCreated(_) => EventKind::BidCreated,
            DomainEvent::BidUpdated(_) => EventKind::BidUpdated,
            DomainEvent::BidDeleted(_) => EventKind::BidDeleted,
            DomainEvent::BidStatusChanged(_) => EventKind::BidStatusChanged,
            DomainEvent::CustomerCreated(_) => EventKind::CustomerCreated,
            DomainEvent::CustomerUpdated(_) => EventKind::CustomerUpdated,
            DomainEvent::CustomerDeleted(_) => EventKind::CustomerDeleted,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
