use serde::{Deserialize, Serialize};

use super::event::MatchEvent;
use super::side::{PerSide, Side};

/// One simulated minute, as returned to the polling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteSummary {
    /// The minute just played (1-based).
    pub minute: u16,
    pub start_state: String,
    pub end_state: String,
    pub possession_end: Side,
    /// Cumulative share of the ball.
    pub possession_pct: PerSide<u32>,
    /// Seconds of this minute spent on the ball; sums to 60.
    pub possession_seconds: PerSide<u32>,
    pub possession_seconds_total: PerSide<u32>,
    pub possession_swings: u32,
    /// Entries during this minute.
    pub entries_final_third: PerSide<u16>,
    pub entries_final_third_total: PerSide<u16>,
    /// Goals scored during this minute.
    pub score: PerSide<u16>,
    pub score_total: PerSide<u16>,
    pub shots_total: PerSide<u16>,
    pub shots_on_target_total: PerSide<u16>,
    pub fouls_total: PerSide<u16>,
    pub momentum: PerSide<f32>,
    pub events: Vec<MatchEvent>,
    pub narrative: Vec<String>,
    /// Continuation token for the next call.
    pub token: String,
}

/// Top-level response body of the minute endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteResponse {
    pub regulation_minutes: u16,
    pub minute_summary: MinuteSummary,
}
