use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use super::utils::{deserialize_id, deserialize_opt_id};

/// Lifecycle status of a bid.
///
/// Statuses the server adds later are kept verbatim in [`BidStatus::Other`]
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BidStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    TechnicalReview,
    CommercialReview,
    Approved,
    Rejected,
    Won,
    Lost,
    Cancelled,
    Other(String),
}

impl BidStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BidStatus::Draft => "draft",
            BidStatus::Submitted => "submitted",
            BidStatus::UnderReview => "under_review",
            BidStatus::TechnicalReview => "technical_review",
            BidStatus::CommercialReview => "commercial_review",
            BidStatus::Approved => "approved",
            BidStatus::Rejected => "rejected",
            BidStatus::Won => "won",
            BidStatus::Lost => "lost",
            BidStatus::Cancelled => "cancelled",
            BidStatus::Other(s) => s,
        }
    }

    /// Won, lost, rejected and cancelled bids are closed.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            BidStatus::Rejected | BidStatus::Won | BidStatus::Lost | BidStatus::Cancelled
        )
    }
}

impl From<String> for BidStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => BidStatus::Draft,
            "submitted" => BidStatus::Submitted,
            "under_review" => BidStatus::UnderReview,
            "technical_review" => BidStatus::TechnicalReview,
            "commercial_review" => BidStatus::CommercialReview,
            "approved" => BidStatus::Approved,
            "rejected" => BidStatus::Rejected,
            "won" => BidStatus::Won,
            "lost" => BidStatus::Lost,
            "cancelled" => BidStatus::Cancelled,
            _ => BidStatus::Other(value),
        }
    }
}

impl From<&str> for BidStatus {
    fn from(value: &str) -> Self {
        BidStatus::from(value.to_string())
    }
}

impl From<BidStatus> for String {
    fn from(status: BidStatus) -> Self {
        match status {
            BidStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bid record as returned by `GET bids/`.
///
/// Only the fields the client reasons about are typed; everything else the
/// server sends is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub status: BidStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Customer id
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_due_date: Option<String>,

    #[serde(default)]
    pub is_urgent: bool,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Bid {
    pub fn new(id: impl Into<String>, code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            title: title.into(),
            status: BidStatus::default(),
            priority: None,
            customer: None,
            bid_due_date: None,
            is_urgent: false,
            extra: Map::new(),
        }
    }

    pub fn with_status(mut self, status: BidStatus) -> Self {
        self.status = status;
        self
    }
}
