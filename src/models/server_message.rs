use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::bid::{Bid, BidStatus};
use super::customer::Customer;
use super::utils::deserialize_id;

/// Raw frame pushed by the server over the realtime channel.
///
/// Every frame is a JSON object carrying an event name and a payload:
/// `{"type": "bid_created", "data": {...}}`. Some producers use `event`
/// instead of `type`; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type", alias = "event")]
    pub event: String,

    #[serde(default)]
    pub data: JsonValue,
}

impl InboundFrame {
    pub fn new(event: impl Into<String>, data: JsonValue) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Payload of `*_deleted` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Payload of `bid_status_changed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub status: BidStatus,
}

/// Domain events understood by the client.
///
/// Frames with any other event name are still delivered as generic messages
/// but never reach the collection reducers.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    BidCreated(Bid),
    BidUpdated(Bid),
    BidDeleted(EntityRef),
    BidStatusChanged(StatusChange),
    CustomerCreated(Customer),
    CustomerUpdated(Customer),
    CustomerDeleted(EntityRef),
}

impl DomainEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BidCreated(_) => "bid_created",
            DomainEvent::BidUpdated(_) => "bid_updated",
            DomainEvent::BidDeleted(_) => "bid_deleted",
            DomainEvent::BidStatusChanged(_) => "bid_status_changed",
            DomainEvent::CustomerCreated(_) => "customer_created",
            DomainEvent::CustomerUpdated(_) => "customer_updated",
            DomainEvent::CustomerDeleted(_) => "customer_deleted",
        }
    }

    /// Decode a frame into a domain event.
    ///
    /// Returns `None` for event names that are not domain events and
    /// `Some(Err(..))` when the name is known but the payload is malformed.
    pub fn from_frame(frame: &InboundFrame) -> Option<Result<Self, serde_json::Error>> {
        Self::decode(&frame.event, &frame.data)
    }

    /// Decode the payload `data` of an event called `name`. Same contract as
    /// [`from_frame`](Self::from_frame).
    pub fn decode(name: &str, data: &JsonValue) -> Option<Result<Self, serde_json::Error>> {
        let event = match name {
            "bid_created" => Bid::deserialize(data).map(DomainEvent::BidCreated),
            "bid_updated" => Bid::deserialize(data).map(DomainEvent::BidUpdated),
            "bid_deleted" => EntityRef::deserialize(data).map(DomainEvent::BidDeleted),
            "bid_status_changed" => {
                StatusChange::deserialize(data).map(DomainEvent::BidStatusChanged)
            },
            "customer_created" => Customer::deserialize(data).map(DomainEvent::CustomerCreated),
            "customer_updated" => Customer::deserialize(data).map(DomainEvent::CustomerUpdated),
            "customer_deleted" => EntityRef::deserialize(data).map(DomainEvent::CustomerDeleted),
            _ => return None,
        };
        Some(event)
    }

    /// Encode back into a wire frame.
    pub fn to_frame(&self) -> Result<InboundFrame, serde_json::Error> {
        let data = match self {
            DomainEvent::BidCreated(bid) | DomainEvent::BidUpdated(bid) => serde_json::to_value(bid)?,
            DomainEvent::BidDeleted(r) | DomainEvent::CustomerDeleted(r) => serde_json::to_value(r)?,
            DomainEvent::BidStatusChanged(change) => serde_json::to_value(change)?,
            DomainEvent::CustomerCreated(c) | DomainEvent::CustomerUpdated(c) => {
                serde_json::to_value(c)?
            },
        };
        Ok(InboundFrame::new(self.name(), data))
    }

    /// Encode as the JSON text the server would push.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_frame()?)
    }
}
