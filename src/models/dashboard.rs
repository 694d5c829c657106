//! Aggregates served by `GET bids/dashboard/`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub overview: DashboardOverview,

    #[serde(default)]
    pub distributions: DashboardDistributions,

    #[serde(default)]
    pub insights: DashboardInsights,
}

/// Headline numbers across all bids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    #[serde(default)]
    pub total_bids: u64,
    #[serde(default)]
    pub active_bids: u64,
    #[serde(default)]
    pub urgent_bids: u64,
    #[serde(default)]
    pub overdue_bids: u64,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub avg_win_probability: f64,
}

/// Bid counts keyed by status and by priority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardDistributions {
    #[serde(default)]
    pub status: HashMap<String, u64>,
    #[serde(default)]
    pub priority: HashMap<String, u64>,
}

/// Rows are passed through as returned; their columns follow the server's
/// aggregation queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardInsights {
    #[serde(default)]
    pub top_customers: Vec<JsonValue>,
    #[serde(default)]
    pub upcoming_deadlines: Vec<JsonValue>,
}
