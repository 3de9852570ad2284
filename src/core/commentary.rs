/// Commentary templates — parsing, loading, and rendering match events as text.

use serde::{Deserialize, Serialize};
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::rng::stable_hash;
use crate::schema::event::{EventKind, MatchEvent};
use crate::schema::side::{PerSide, Side, TeamNames};

/// Commentary compiled into the crate.
const BUILTIN_COMMENTARY: &str = include_str!("../../commentary/default.ron");

/// Rule used when a minute produced no other line.
pub const CALM_RULE: &str = "calm";

/// Rule for the kickoff that follows a goal.
pub const RESTART_RULE: &str = "restart";

#[derive(Debug, Error)]
pub enum CommentaryError {
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("unknown template slot '{0}'")]
    UnknownSlot(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A value a template can interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    /// The event's team.
    Team,
    Opponent,
    Home,
    Away,
    ScoreHome,
    ScoreAway,
    Player,
    Minute,
    Passes,
}

impl Slot {
    pub fn parse(name: &str) -> Option<Slot> {
        Some(match name {
            "team" => Self::Team,
            "opponent" => Self::Opponent,
            "home" => Self::Home,
            "away" => Self::Away,
            "score_home" => Self::ScoreHome,
            "score_away" => Self::ScoreAway,
            "player" => Self::Player,
            "minute" => Self::Minute,
            "passes" => Self::Passes,
            _ => return None,
        })
    }
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// `{slot}` interpolation.
    Slot(Slot),
}

/// A parsed template — a sequence of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{slot}` → `Slot`, one of `team`, `opponent`, `home`, `away`,
    ///   `score_home`, `score_away`, `player`, `minute`, `passes`
    /// - `{{` / `}}` → literal braces
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, CommentaryError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' if i + 1 < len && chars[i + 1] == '{' => {
                    literal_buf.push('{');
                    i += 2;
                }
                '{' => {
                    if !literal_buf.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                    }

                    let start = i + 1;
                    let mut end = start;
                    while end < len && chars[end] != '}' {
                        if chars[end] == '{' {
                            return Err(CommentaryError::TemplateParse(
                                "nested braces are not allowed".to_string(),
                            ));
                        }
                        end += 1;
                    }
                    if end == len {
                        return Err(CommentaryError::TemplateParse(
                            "unclosed brace".to_string(),
                        ));
                    }

                    let name: String = chars[start..end].iter().collect();
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(CommentaryError::TemplateParse(
                            "empty braces".to_string(),
                        ));
                    }
                    let slot =
                        Slot::parse(name).ok_or_else(|| CommentaryError::UnknownSlot(name.to_string()))?;
                    segments.push(TemplateSegment::Slot(slot));
                    i = end + 1;
                }
                '}' if i + 1 < len && chars[i + 1] == '}' => {
                    literal_buf.push('}');
                    i += 2;
                }
                '}' => {
                    return Err(CommentaryError::TemplateParse(
                        "unmatched closing brace".to_string(),
                    ));
                }
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    pub fn mentions(&self, slot: Slot) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, TemplateSegment::Slot(found) if *found == slot))
    }

    /// Every slot this template uses can be filled from `line`.
    fn fits(&self, line: &LineContext<'_>) -> bool {
        self.segments.iter().all(|segment| match segment {
            TemplateSegment::Slot(slot) => line.value(*slot).is_some(),
            TemplateSegment::Literal(_) => true,
        })
    }

    fn render(&self, line: &LineContext<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Slot(slot) => {
                    if let Some(value) = line.value(*slot) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

/// A weighted text alternative within a commentary rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub weight: u32,
    pub template: Template,
}

/// All the ways of describing one kind of event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentaryRule {
    pub name: String,
    pub alternatives: Vec<Alternative>,
}

/// Fixed facts about the minute being narrated.
#[derive(Debug, Clone)]
pub struct NarrationContext<'a> {
    pub teams: &'a TeamNames,
    pub minute: u16,
    /// Score before the minute started.
    pub score_before: PerSide<u16>,
}

/// Values available to one line.
struct LineContext<'a> {
    ctx: &'a NarrationContext<'a>,
    team: Option<Side>,
    player: Option<&'a str>,
    passes: Option<u16>,
    score: PerSide<u16>,
}

impl LineContext<'_> {
    fn value(&self, slot: Slot) -> Option<String> {
        let teams = self.ctx.teams;
        match slot {
            Slot::Team => self.team.map(|side| teams.name(side).to_string()),
            Slot::Opponent => self.team.map(|side| teams.name(side.opponent()).to_string()),
            Slot::Home => Some(teams.home.clone()),
            Slot::Away => Some(teams.away.clone()),
            Slot::ScoreHome => Some(self.score.home.to_string()),
            Slot::ScoreAway => Some(self.score.away.to_string()),
            Slot::Player => self.player.map(str::to_string),
            Slot::Minute => Some(self.ctx.minute.to_string()),
            Slot::Passes => self.passes.map(|p| p.to_string()),
        }
    }
}

/// A set of named commentary rules, one per event kind plus `calm`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Commentary {
    pub rules: FxHashMap<String, CommentaryRule>,
}

// RON authoring shape: templates are plain strings there.

#[derive(Debug, Deserialize)]
struct RonAlternative {
    weight: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Rule")]
struct RonRule {
    alternatives: Vec<RonAlternative>,
}

impl Commentary {
    /// The commentary shipped with the crate.
    pub fn builtin() -> Result<Commentary, CommentaryError> {
        Self::parse_ron(BUILTIN_COMMENTARY)
    }

    /// Load a commentary set from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Commentary, CommentaryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a commentary set from a RON string.
    pub fn parse_ron(input: &str) -> Result<Commentary, CommentaryError> {
        let raw: HashMap<String, RonRule> = ron::from_str(input)?;
        let mut rules = FxHashMap::default();

        for (name, ron_rule) in raw {
            let mut alternatives = Vec::new();
            for alt in ron_rule.alternatives {
                alternatives.push(Alternative {
                    weight: alt.weight,
                    template: Template::parse(&alt.text)?,
                });
            }
            rules.insert(name.clone(), CommentaryRule { name, alternatives });
        }

        Ok(Commentary { rules })
    }

    /// Merge another set into this one. Rules from `other` win.
    pub fn merge(&mut self, other: Commentary) {
        for (name, rule) in other.rules {
            self.rules.insert(name, rule);
        }
    }

    /// Render the minute's events, one line per event that has a usable
    /// rule, in event order. A minute with no lines gets one calm line if
    /// the set has a `calm` rule.
    pub fn narrate(&self, events: &[MatchEvent], ctx: &NarrationContext<'_>) -> Vec<String> {
        let mut score = ctx.score_before;
        let mut lines = Vec::new();

        for (index, event) in events.iter().enumerate() {
            if let EventKind::Goal { score: after } = event.kind {
                score = after;
            }
            let passes = match event.kind {
                EventKind::PassStreak { passes } => Some(passes),
                _ => None,
            };
            let line = LineContext {
                ctx,
                team: Some(event.team),
                player: event.player.as_deref(),
                passes,
                score,
            };
            if let Some(text) = self.render_rule(event.kind.commentary_rule(), index, &line) {
                lines.push(text);
            }
        }

        if lines.is_empty() {
            let line = LineContext {
                ctx,
                team: None,
                player: None,
                passes: None,
                score,
            };
            if let Some(text) = self.render_rule(CALM_RULE, events.len(), &line) {
                lines.push(text);
            }
        }

        lines
    }

    /// Pick an alternative of `rule` by a stable hash of the minute, the
    /// event's position and the rule name, so narration never draws on the
    /// match's random stream.
    fn render_rule(&self, rule: &str, index: usize, line: &LineContext<'_>) -> Option<String> {
        let rule = self.rules.get(rule)?;
        let eligible: Vec<&Alternative> = rule
            .alternatives
            .iter()
            .filter(|alt| alt.weight > 0 && alt.template.fits(line))
            .collect();
        let total: u64 = eligible.iter().map(|alt| u64::from(alt.weight)).sum();
        if total == 0 {
            return None;
        }

        let mut pick = stable_hash((line.ctx.minute, index as u64, rule.name.as_str())) % total;
        for alt in eligible {
            let weight = u64::from(alt.weight);
            if pick < weight {
                return Some(alt.template.render(line));
            }
            pick -= weight;
        }
        None
    }
}
