use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::utils::deserialize_id;

/// A customer record as returned by `GET bids/customers/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default)]
    pub email: String,

    /// government, corporate, sme or individual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_active() -> bool {
    true
}

impl Customer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: None,
            email: String::new(),
            customer_type: None,
            is_active: true,
            extra: Map::new(),
        }
    }
}
