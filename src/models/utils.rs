//! Serde helpers shared by the domain models.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value as JsonValue;

fn id_from_value<E: de::Error>(value: JsonValue) -> Result<String, E> {
    match value {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(E::custom(format!(
            "expected a string or numeric id, got {}",
            other
        ))),
    }
}

/// Accept identifiers serialized either as JSON strings (UUID primary keys)
/// or numbers (auto-increment primary keys).
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    id_from_value(JsonValue::deserialize(deserializer)?)
}

/// Optional variant of [`deserialize_id`] for foreign keys; `null` maps to `None`.
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(None),
        value => id_from_value(value).map(Some),
    }
}
