use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::utils::{deserialize_id, deserialize_opt_id};

/// A bid review (`bids/reviews/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub bid: Option<String>,

    /// technical, commercial, legal, financial, risk or final
    #[serde(default)]
    pub review_type: String,

    #[serde(default = "default_status")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_status() -> String {
    "pending".to_string()
}
