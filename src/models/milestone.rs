use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::utils::{deserialize_id, deserialize_opt_id};

/// A bid milestone (`bids/milestones/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Owning bid id
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub bid: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    /// pending, in_progress, completed, delayed or cancelled
    #[serde(default = "default_status")]
    pub status: String,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_status() -> String {
    "pending".to_string()
}
