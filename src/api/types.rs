//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::leaderboard::{RankedEntry, RankedTable};

/// Body of `GET /leaderboard`.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    /// Ranked entries, best first.
    pub entries: Vec<RankedEntry>,
    /// Ranked entries before any `limit` was applied.
    pub total_ranked: usize,
    /// Records left out for comfort violations.
    pub excluded_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl LeaderboardResponse {
    /// Response for `table`, keeping at most `limit` entries.
    pub fn from_table(table: &RankedTable, limit: Option<usize>) -> Self {
        let take = limit.unwrap_or(usize::MAX);
        Self {
            entries: table.entries.iter().take(take).cloned().collect(),
            total_ranked: table.len(),
            excluded_count: table.excluded.len(),
            diagnostic: table.diagnostic.clone(),
        }
    }
}

/// Query parameters for `GET /leaderboard`.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Maximum number of entries to return (must be > 0).
    pub limit: Option<usize>,
}

/// Error body for 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
