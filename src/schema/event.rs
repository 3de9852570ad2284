use serde::{Deserialize, Serialize};

use super::side::{PerSide, Side};

/// What happened, with the fields specific to that kind of event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Play starts from the centre spot. `restart` marks the kickoff
    /// after a goal rather than the start of a half.
    Kickoff {
        half: u8,
        #[serde(default)]
        restart: bool,
    },
    /// The team strung together another run of completed passes.
    PassStreak { passes: u16 },
    FinalThirdEntry,
    /// The team won the ball back.
    PossessionSwing,
    ShotSaved { corner: bool },
    ShotMissed,
    /// `score` is the running score including this goal.
    Goal { score: PerSide<u16> },
    /// Committed by the team.
    Foul,
    /// A player of the team went down.
    Injury,
}

impl EventKind {
    /// Returns the wire/commentary name for this kind (e.g., "shot_saved").
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kickoff { .. } => "kickoff",
            Self::PassStreak { .. } => "pass_streak",
            Self::FinalThirdEntry => "final_third_entry",
            Self::PossessionSwing => "possession_swing",
            Self::ShotSaved { .. } => "shot_saved",
            Self::ShotMissed => "shot_missed",
            Self::Goal { .. } => "goal",
            Self::Foul => "foul",
            Self::Injury => "injury",
        }
    }

    /// Commentary rule that narrates this event.
    pub fn commentary_rule(&self) -> &'static str {
        match self {
            Self::Kickoff { restart: true, .. } => "restart",
            other => other.name(),
        }
    }

    /// Whether a roster player can be attached to this kind of event.
    pub fn takes_player(&self) -> bool {
        matches!(
            self,
            Self::ShotSaved { .. } | Self::ShotMissed | Self::Goal { .. } | Self::Foul | Self::Injury
        )
    }

    /// All kind names, in a stable order.
    pub const NAMES: [&'static str; 9] = [
        "kickoff",
        "pass_streak",
        "final_third_entry",
        "possession_swing",
        "shot_saved",
        "shot_missed",
        "goal",
        "foul",
        "injury",
    ];
}

/// A discrete match event. Serialized flat: `{"minute", "team", "type", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: u16,
    pub team: Side,
    #[serde(flatten)]
    pub kind: EventKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = MatchEvent {
            minute: 12,
            team: Side::Home,
            kind: EventKind::Goal {
                score: PerSide::new(1, 0),
            },
            description: "Goal for Rovers".to_string(),
            player: Some("Nine".to_string()),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "goal");
        assert_eq!(json["minute"], 12);
        assert_eq!(json["team"], "home");
        assert_eq!(json["score"]["home"], 1);
        assert_eq!(json["player"], "Nine");
    }

    #[test]
    fn player_omitted_when_absent() {
        let event = MatchEvent {
            minute: 3,
            team: Side::Away,
            kind: EventKind::Foul,
            description: "Foul by United".to_string(),
            player: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("player"));
        assert!(json.contains("\"type\":\"foul\""));
    }

    #[test]
    fn names_cover_every_kind() {
        let kinds = [
            EventKind::Kickoff {
                half: 1,
                restart: false,
            },
            EventKind::PassStreak { passes: 6 },
            EventKind::FinalThirdEntry,
            EventKind::PossessionSwing,
            EventKind::ShotSaved { corner: false },
            EventKind::ShotMissed,
            EventKind::Goal {
                score: PerSide::default(),
            },
            EventKind::Foul,
            EventKind::Injury,
        ];
        for (kind, name) in kinds.iter().zip(EventKind::NAMES) {
            assert_eq!(kind.name(), name);
        }
    }
}
