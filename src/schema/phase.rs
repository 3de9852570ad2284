use serde::{Deserialize, Serialize};

/// A node of the per-minute play state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Kickoff,
    Midfield,
    Buildup,
    FinalThirdEntry,
    Shot,
    Turnover,
    DeadBall,
    InjuryStoppage,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Kickoff,
        Phase::Midfield,
        Phase::Buildup,
        Phase::FinalThirdEntry,
        Phase::Shot,
        Phase::Turnover,
        Phase::DeadBall,
        Phase::InjuryStoppage,
    ];

    /// Returns the wire name for this phase (e.g., "final_third_entry").
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kickoff => "kickoff",
            Self::Midfield => "midfield",
            Self::Buildup => "buildup",
            Self::FinalThirdEntry => "final_third_entry",
            Self::Shot => "shot",
            Self::Turnover => "turnover",
            Self::DeadBall => "dead_ball",
            Self::InjuryStoppage => "injury_stoppage",
        }
    }

    /// How far up the pitch the holder is. Restarts and stoppages sit at 0.
    pub fn depth(&self) -> u8 {
        match self {
            Self::Kickoff | Self::Turnover | Self::DeadBall | Self::InjuryStoppage => 0,
            Self::Midfield => 1,
            Self::Buildup => 2,
            Self::FinalThirdEntry => 3,
            Self::Shot => 4,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_serde() {
        for phase in Phase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.name()));
        }
    }

    #[test]
    fn attacking_phases_deepen() {
        assert!(Phase::Midfield.depth() < Phase::Buildup.depth());
        assert!(Phase::Buildup.depth() < Phase::FinalThirdEntry.depth());
        assert!(Phase::FinalThirdEntry.depth() < Phase::Shot.depth());
        assert_eq!(Phase::DeadBall.depth(), 0);
    }
}
