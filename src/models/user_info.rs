use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::utils::deserialize_id;

/// User summary embedded in auth responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// admin, bid_manager, reviewer, ...
    #[serde(default)]
    pub role: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}
