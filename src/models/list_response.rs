use serde::{Deserialize, Serialize};

/// List endpoints answer either with a bare array or, when pagination is
/// enabled server-side, with a `{count, next, previous, results}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Plain(Vec<T>),
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Paginated { results, .. } => results,
            ListResponse::Plain(items) => items,
        }
    }

    /// Total number of records server-side, when the server reported it.
    pub fn total(&self) -> Option<u64> {
        match self {
            ListResponse::Paginated { count, .. } => *count,
            ListResponse::Plain(items) => Some(items.len() as u64),
        }
    }
}
