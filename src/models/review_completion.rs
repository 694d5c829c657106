use serde::{Deserialize, Serialize};

/// Body of `POST bids/reviews/<id>/complete/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCompletion {
    /// approved, rejected or needs_revision. The server requires it.
    pub decision: String,

    #[serde(default)]
    pub comments: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl ReviewCompletion {
    pub fn new(decision: impl Into<String>) -> Self {
        Self {
            decision: decision.into(),
            comments: String::new(),
            score: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }
}

/// `{"message": ...}` acknowledgement returned by action endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
