use serde::{Deserialize, Serialize};

use super::phase::Phase;
use super::side::{PerSide, Side};

/// Default match length.
pub const DEFAULT_REGULATION_MINUTES: u16 = 90;
/// Club rating used when the roster service supplies none.
pub const DEFAULT_STRENGTH: u8 = 50;
pub const MIN_STRENGTH: u8 = 1;
pub const MAX_STRENGTH: u8 = 99;

/// Everything the engine remembers between two minutes. Carried to the
/// caller inside the continuation token and never stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Version of the transition table that produced this state.
    pub model_version: u8,
    pub regulation_minutes: u16,
    /// Minutes already played.
    pub minute: u16,
    pub possession: Side,
    pub phase: Phase,
    /// Side that kicked off the first half.
    pub kickoff_side: Side,
    pub score: PerSide<u16>,
    pub possession_seconds: PerSide<u32>,
    pub entries_final_third: PerSide<u16>,
    pub momentum: PerSide<f32>,
    pub pass_streak: PerSide<u16>,
    /// Club ratings, fixed at kickoff.
    pub strength: PerSide<u8>,
    pub shots: PerSide<u16>,
    pub shots_on_target: PerSide<u16>,
    pub fouls: PerSide<u16>,
    /// Word offset into the seed-derived random stream.
    pub rng_cursor: u64,
}

impl MatchState {
    /// A match at minute 0: kickoff phase, zero counters.
    pub fn fresh(
        model_version: u8,
        regulation_minutes: u16,
        kickoff_side: Side,
        strength: PerSide<u8>,
    ) -> Self {
        Self {
            model_version,
            regulation_minutes,
            minute: 0,
            possession: kickoff_side,
            phase: Phase::Kickoff,
            kickoff_side,
            score: PerSide::default(),
            possession_seconds: PerSide::default(),
            entries_final_third: PerSide::default(),
            momentum: PerSide::default(),
            pass_streak: PerSide::default(),
            strength: strength.map(|s| (*s).clamp(MIN_STRENGTH, MAX_STRENGTH)),
            shots: PerSide::default(),
            shots_on_target: PerSide::default(),
            fouls: PerSide::default(),
            rng_cursor: 0,
        }
    }

    /// Reject values the engine can never produce and cannot play from.
    pub fn validate(&self) -> Result<(), String> {
        if self.regulation_minutes == 0 {
            return Err("regulation_minutes is 0".to_string());
        }
        for side in [Side::Home, Side::Away] {
            let strength = *self.strength.get(side);
            if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&strength) {
                return Err(format!("{} strength {strength}", side.label()));
            }
            let momentum = *self.momentum.get(side);
            if !momentum.is_finite() {
                return Err(format!("{} momentum {momentum}", side.label()));
            }
        }
        Ok(())
    }

    /// No further minute can be produced from this state.
    pub fn is_finished(&self) -> bool {
        self.minute >= self.regulation_minutes
    }

    /// The minute after which the second half kicks off, if the match has halves.
    pub fn half_time(&self) -> Option<u16> {
        (self.regulation_minutes >= 2).then_some(self.regulation_minutes / 2)
    }

    /// Cumulative possession share in whole percent. Home is rounded and
    /// away takes the remainder, so the pair always sums to 100.
    pub fn possession_pct(&self) -> PerSide<u32> {
        let home = u64::from(self.possession_seconds.home);
        let total = home + u64::from(self.possession_seconds.away);
        if total == 0 {
            return PerSide::new(50, 50);
        }
        let home_pct = ((home * 200 + total) / (total * 2)) as u32;
        PerSide::new(home_pct, 100 - home_pct)
    }
}
