/// Markov transition engine — advances a match by one minute of play.
///
/// A minute is a short walk (1–6 steps) over `Phase` nodes. Each step makes
/// exactly one weighted draw from the current phase's row of the
/// `TransitionTable`, after biasing the row toward the side in possession
/// by club strength and momentum.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::rng::MinuteRng;
use crate::schema::phase::Phase;
use crate::schema::side::Side;
use crate::schema::state::MatchState;

/// Version of the built-in table. Bump whenever any weight changes.
pub const MODEL_VERSION: u8 = 0;

/// Seconds in a simulated minute.
pub const SECONDS_PER_MINUTE: u32 = 60;

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("transition table has no row for phase {0}")]
    MissingRow(Phase),
    #[error("transition row for phase {0} has no positive weight")]
    EmptyRow(Phase),
    #[error("step weights must cover 1..=6 steps with a positive total")]
    BadStepWeights,
    #[error("bias {0} is outside 0.0..=0.9")]
    BadBias(f64),
    #[error("momentum decay {0} is outside 0.0..=1.0")]
    BadDecay(f32),
    #[error("weighted sampling failed: {0}")]
    Weights(#[from] WeightedError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One outcome of a transition step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// The holder keeps the ball and play moves to the given phase.
    Keep(Phase),
    /// The ball is lost in open play.
    Turnover,
    /// The holder is fouled; free kick.
    Foul,
    /// Play stops for an injury; the holder restarts.
    Injury,
    Goal,
    /// Shot saved and put behind for a corner.
    SavedCorner,
    /// Shot saved and held by the keeper.
    SavedHeld,
    /// Shot off target; goal kick to the defenders.
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tendency {
    Progressive,
    Regressive,
    Neutral,
}

impl Move {
    /// Phase the match is in after this move.
    pub fn next_phase(&self) -> Phase {
        match self {
            Self::Keep(phase) => *phase,
            Self::Turnover | Self::SavedHeld => Phase::Turnover,
            Self::Foul | Self::SavedCorner | Self::Miss => Phase::DeadBall,
            Self::Injury => Phase::InjuryStoppage,
            Self::Goal => Phase::Kickoff,
        }
    }

    /// Whether the ball changes hands.
    pub fn changes_possession(&self) -> bool {
        matches!(
            self,
            Self::Turnover | Self::SavedHeld | Self::Miss | Self::Goal
        )
    }

    /// A shot was resolved by this move.
    pub fn is_shot(&self) -> bool {
        matches!(
            self,
            Self::Goal | Self::SavedCorner | Self::SavedHeld | Self::Miss
        )
    }

    fn tendency(&self, from: Phase) -> Tendency {
        match self {
            Self::Keep(to) if to.depth() > from.depth() => Tendency::Progressive,
            Self::Goal => Tendency::Progressive,
            Self::Turnover | Self::SavedHeld | Self::Miss => Tendency::Regressive,
            _ => Tendency::Neutral,
        }
    }
}

/// Momentum added when something good happens to a side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumNudges {
    pub goal: f32,
    /// Applied (negatively) to the side that concedes.
    pub conceded: f32,
    pub shot: f32,
    pub final_third: f32,
    pub pass_streak: f32,
}

/// The probability model: weighted moves per phase plus the knobs that
/// bias them. Serialisable so alternative models can be authored in RON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionTable {
    /// Written into every state this table produces.
    pub version: u8,
    pub rows: HashMap<Phase, Vec<(Move, u32)>>,
    /// Weights for how many steps a minute takes.
    pub step_weights: Vec<(u8, u32)>,
    /// How strongly the holder's edge tilts progressive vs regressive moves.
    pub bias: f64,
    /// Multiplier applied to both momenta at the start of every minute.
    pub momentum_decay: f32,
    pub nudges: MomentumNudges,
    /// A pass-streak event fires every this many consecutive keeps.
    pub pass_streak_milestone: u16,
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::v0()
    }
}

impl TransitionTable {
    /// The built-in "Markov v0" model. Tuned for roughly 2.5 goals and 20
    /// shots per 90 minutes between evenly matched sides.
    pub fn v0() -> Self {
        use Move::*;
        use Phase::*;

        let rows = HashMap::from([
            (
                Kickoff,
                vec![(Keep(Midfield), 70), (Keep(Buildup), 22), (Move::Turnover, 8)],
            ),
            (
                Midfield,
                vec![
                    (Keep(Midfield), 24),
                    (Keep(Buildup), 38),
                    (Move::Turnover, 28),
                    (Foul, 8),
                    (Injury, 2),
                ],
            ),
            (
                Buildup,
                vec![
                    (Keep(Buildup), 18),
                    (Keep(FinalThirdEntry), 34),
                    (Keep(Midfield), 10),
                    (Move::Turnover, 32),
                    (Foul, 9),
                    (Injury, 1),
                ],
            ),
            (
                FinalThirdEntry,
                vec![
                    (Keep(Shot), 48),
                    (Keep(Buildup), 12),
                    (Move::Turnover, 30),
                    (Foul, 10),
                ],
            ),
            (
                Shot,
                vec![(Goal, 13), (SavedCorner, 15), (SavedHeld, 24), (Miss, 48)],
            ),
            (
                Phase::Turnover,
                vec![
                    (Keep(Midfield), 52),
                    (Keep(Buildup), 28),
                    (Move::Turnover, 14),
                    (Foul, 6),
                ],
            ),
            (
                DeadBall,
                vec![
                    (Keep(Midfield), 34),
                    (Keep(Buildup), 30),
                    (Keep(FinalThirdEntry), 22),
                    (Keep(Shot), 8),
                    (Move::Turnover, 10),
                ],
            ),
            (
                InjuryStoppage,
                vec![
                    (Keep(Midfield), 60),
                    (Keep(Buildup), 28),
                    (Move::Turnover, 12),
                ],
            ),
        ]);

        Self {
            version: MODEL_VERSION,
            rows,
            step_weights: vec![(1, 1), (2, 2), (3, 4), (4, 5), (5, 3), (6, 2)],
            bias: 0.35,
            momentum_decay: 0.85,
            nudges: MomentumNudges {
                goal: 0.30,
                conceded: 0.10,
                shot: 0.06,
                final_third: 0.05,
                pass_streak: 0.04,
            },
            pass_streak_milestone: 6,
        }
    }

    /// Parse a table from a RON string and validate it.
    pub fn parse_ron(input: &str) -> Result<TransitionTable, TransitionError> {
        let table: TransitionTable = ron::from_str(input)?;
        table.validate()?;
        Ok(table)
    }

    /// Check that every phase has a usable row and the knobs are in range.
    pub fn validate(&self) -> Result<(), TransitionError> {
        for phase in Phase::ALL {
            let row = self
                .rows
                .get(&phase)
                .ok_or(TransitionError::MissingRow(phase))?;
            if row.iter().all(|(_, weight)| *weight == 0) {
                return Err(TransitionError::EmptyRow(phase));
            }
        }

        let steps_ok = self
            .step_weights
            .iter()
            .all(|(steps, _)| (1..=6).contains(steps))
            && self.step_weights.iter().any(|(_, weight)| *weight > 0);
        if !steps_ok {
            return Err(TransitionError::BadStepWeights);
        }

        if !(0.0..=0.9).contains(&self.bias) {
            return Err(TransitionError::BadBias(self.bias));
        }
        if !(0.0..=1.0).contains(&self.momentum_decay) {
            return Err(TransitionError::BadDecay(self.momentum_decay));
        }
        Ok(())
    }

    /// Weights for leaving `from`, tilted by the holder's `edge` in -1.0..=1.0.
    fn biased_row(
        &self,
        from: Phase,
        edge: f64,
    ) -> Result<(&[(Move, u32)], Vec<f64>), TransitionError> {
        let row = self
            .rows
            .get(&from)
            .ok_or(TransitionError::MissingRow(from))?;
        let weights = row
            .iter()
            .map(|(mv, weight)| {
                let weight = f64::from(*weight);
                match mv.tendency(from) {
                    Tendency::Progressive => weight * (1.0 + self.bias * edge),
                    Tendency::Regressive => weight * (1.0 - self.bias * edge),
                    Tendency::Neutral => weight,
                }
            })
            .collect();
        Ok((row.as_slice(), weights))
    }
}

/// One step of the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Side in possession when the step began.
    pub holder: Side,
    pub from: Phase,
    pub mv: Move,
    pub to: Phase,
    /// Side in possession after the step.
    pub next_holder: Side,
    /// Seconds of the minute this step took.
    pub seconds: u32,
    /// Holder's pass streak after the step.
    pub streak: u16,
    /// The step completed a pass-streak milestone.
    pub milestone: bool,
}

/// Everything the engine did during one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteTrace {
    pub start_phase: Phase,
    pub start_holder: Side,
    pub transitions: Vec<Transition>,
}

/// Holder's advantage: strength difference plus momentum difference, clamped.
pub fn edge(state: &MatchState, holder: Side) -> f64 {
    let opponent = holder.opponent();
    let strength = (f64::from(*state.strength.get(holder))
        - f64::from(*state.strength.get(opponent)))
        / 100.0;
    let momentum =
        f64::from(*state.momentum.get(holder)) - f64::from(*state.momentum.get(opponent));
    (strength + momentum).clamp(-1.0, 1.0)
}

fn nudge(momentum: &mut f32, amount: f32) {
    *momentum = (*momentum + amount).clamp(-1.0, 1.0);
}

/// Split a minute's seconds across `steps`, front-loading any remainder.
fn step_seconds(steps: usize, index: usize) -> u32 {
    let steps = steps.max(1) as u32;
    let base = SECONDS_PER_MINUTE / steps;
    let remainder = SECONDS_PER_MINUTE % steps;
    base + u32::from((index as u32) < remainder)
}

/// Walks the transition table. Holds no per-match state.
#[derive(Debug, Clone, Default)]
pub struct TransitionEngine {
    table: TransitionTable,
}

impl TransitionEngine {
    pub fn new(table: TransitionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Play one minute: update phase, possession, momentum and pass streaks
    /// in `state` and return the walk taken. Counters and the minute itself
    /// are left to the aggregator.
    pub fn play_minute(
        &self,
        state: &mut MatchState,
        rng: &mut MinuteRng,
    ) -> Result<MinuteTrace, TransitionError> {
        let decay = self.table.momentum_decay;
        for side in [Side::Home, Side::Away] {
            let momentum = state.momentum.get_mut(side);
            if !momentum.is_finite() {
                *momentum = 0.0;
            }
            *momentum = (*momentum * decay).clamp(-1.0, 1.0);
        }

        if state.half_time() == Some(state.minute) {
            state.phase = Phase::Kickoff;
            state.possession = state.kickoff_side.opponent();
            state.pass_streak = Default::default();
        }

        let start_phase = state.phase;
        let start_holder = state.possession;

        let step_dist = WeightedIndex::new(self.table.step_weights.iter().map(|(_, w)| *w))?;
        let steps = usize::from(self.table.step_weights[step_dist.sample(rng)].0);

        let mut transitions = Vec::with_capacity(steps);
        for index in 0..steps {
            let holder = state.possession;
            let from = state.phase;
            let (row, weights) = self.table.biased_row(from, edge(state, holder))?;
            let dist = WeightedIndex::new(&weights)?;
            let mv = row[dist.sample(rng)].0;

            let transition = self.apply(state, holder, from, mv, step_seconds(steps, index));
            log::trace!(
                "minute {} step {}: {:?} {} -> {} ({:?})",
                state.minute + 1,
                index,
                holder,
                from,
                transition.to,
                mv
            );
            transitions.push(transition);
        }

        Ok(MinuteTrace {
            start_phase,
            start_holder,
            transitions,
        })
    }

    fn apply(
        &self,
        state: &mut MatchState,
        holder: Side,
        from: Phase,
        mv: Move,
        seconds: u32,
    ) -> Transition {
        let opponent = holder.opponent();
        let nudges = &self.table.nudges;
        let mut milestone = false;

        match mv {
            Move::Keep(to) => {
                let streak = state.pass_streak.get_mut(holder);
                *streak = streak.saturating_add(1);
                let milestone_len = self.table.pass_streak_milestone;
                if milestone_len > 0 && *streak % milestone_len == 0 {
                    milestone = true;
                    nudge(state.momentum.get_mut(holder), nudges.pass_streak);
                }
                if to == Phase::FinalThirdEntry {
                    nudge(state.momentum.get_mut(holder), nudges.final_third);
                }
            }
            Move::Goal => {
                nudge(state.momentum.get_mut(holder), nudges.goal);
                nudge(state.momentum.get_mut(opponent), -nudges.conceded);
                state.pass_streak = Default::default();
            }
            Move::Turnover | Move::SavedHeld | Move::Miss => {
                if mv.is_shot() {
                    nudge(state.momentum.get_mut(holder), nudges.shot);
                }
                *state.pass_streak.get_mut(holder) = 0;
                *state.pass_streak.get_mut(opponent) = 0;
            }
            Move::SavedCorner => {
                nudge(state.momentum.get_mut(holder), nudges.shot);
            }
            Move::Foul | Move::Injury => {}
        }

        let next_holder = if mv.changes_possession() {
            opponent
        } else {
            holder
        };
        let to = mv.next_phase();
        state.phase = to;
        state.possession = next_holder;

        Transition {
            holder,
            from,
            mv,
            to,
            next_holder,
            seconds,
            streak: *state.pass_streak.get(holder),
            milestone,
        }
    }
}

/// Save a transition table to a RON file.
pub fn save_table(table: &TransitionTable, path: &Path) -> Result<(), TransitionError> {
    let serialized = ron::ser::to_string_pretty(table, ron::ser::PrettyConfig::default())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    std::fs::write(path, serialized)?;
    Ok(())
}

/// Load and validate a transition table from a RON file.
pub fn load_table(path: &Path) -> Result<TransitionTable, TransitionError> {
    let contents = std::fs::read_to_string(path)?;
    TransitionTable::parse_ron(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::side::PerSide;

    fn kickoff_state() -> MatchState {
        MatchState::fresh(MODEL_VERSION, 90, Side::Home, PerSide::new(50, 50))
    }

    #[test]
    fn v0_table_is_valid() {
        TransitionTable::v0().validate().unwrap();
    }

    #[test]
    fn missing_row_is_rejected() {
        let mut table = TransitionTable::v0();
        table.rows.remove(&Phase::Shot);
        assert!(matches!(
            table.validate(),
            Err(TransitionError::MissingRow(Phase::Shot))
        ));
    }

    #[test]
    fn zero_row_is_rejected() {
        let mut table = TransitionTable::v0();
        table
            .rows
            .insert(Phase::DeadBall, vec![(Move::Turnover, 0)]);
        assert!(matches!(
            table.validate(),
            Err(TransitionError::EmptyRow(Phase::DeadBall))
        ));
    }

    #[test]
    fn out_of_range_knobs_are_rejected() {
        let mut table = TransitionTable::v0();
        table.bias = 1.5;
        assert!(matches!(table.validate(), Err(TransitionError::BadBias(_))));

        let mut table = TransitionTable::v0();
        table.step_weights = vec![(9, 1)];
        assert!(matches!(
            table.validate(),
            Err(TransitionError::BadStepWeights)
        ));
    }

    #[test]
    fn step_seconds_cover_the_minute() {
        for steps in 1..=6 {
            let total: u32 = (0..steps).map(|i| step_seconds(steps, i)).sum();
            assert_eq!(total, SECONDS_PER_MINUTE);
        }
    }

    #[test]
    fn minute_takes_one_to_six_steps() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        let mut rng = MinuteRng::resume(42, 0);
        for _ in 0..30 {
            let trace = engine.play_minute(&mut state, &mut rng).unwrap();
            assert!((1..=6).contains(&trace.transitions.len()));
            let seconds: u32 = trace.transitions.iter().map(|t| t.seconds).sum();
            assert_eq!(seconds, SECONDS_PER_MINUTE);
            state.minute += 1;
        }
    }

    #[test]
    fn walk_is_chained() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        let mut rng = MinuteRng::resume(5, 0);
        let trace = engine.play_minute(&mut state, &mut rng).unwrap();

        assert_eq!(trace.start_phase, Phase::Kickoff);
        let mut phase = trace.start_phase;
        let mut holder = trace.start_holder;
        for t in &trace.transitions {
            assert_eq!(t.from, phase);
            assert_eq!(t.holder, holder);
            assert_eq!(t.to, t.mv.next_phase());
            phase = t.to;
            holder = t.next_holder;
        }
        assert_eq!(state.phase, phase);
        assert_eq!(state.possession, holder);
    }

    #[test]
    fn same_cursor_same_walk() {
        let engine = TransitionEngine::default();
        let mut a = kickoff_state();
        let mut b = kickoff_state();
        let ta = engine
            .play_minute(&mut a, &mut MinuteRng::resume(99, 40))
            .unwrap();
        let tb = engine
            .play_minute(&mut b, &mut MinuteRng::resume(99, 40))
            .unwrap();
        assert_eq!(ta, tb);
        assert_eq!(a, b);
    }

    #[test]
    fn turnover_resets_streaks() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        state.pass_streak = PerSide::new(4, 2);
        let t = engine.apply(&mut state, Side::Home, Phase::Midfield, Move::Turnover, 20);
        assert_eq!(t.next_holder, Side::Away);
        assert_eq!(state.pass_streak, PerSide::new(0, 0));
        assert_eq!(state.phase, Phase::Turnover);
    }

    #[test]
    fn keep_increments_streak_and_marks_milestone() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        state.pass_streak = PerSide::new(5, 0);
        let t = engine.apply(
            &mut state,
            Side::Home,
            Phase::Midfield,
            Move::Keep(Phase::Buildup),
            10,
        );
        assert_eq!(t.streak, 6);
        assert!(t.milestone);
        assert!(state.momentum.home > 0.0);
    }

    #[test]
    fn goal_restarts_with_conceding_side() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        let t = engine.apply(&mut state, Side::Away, Phase::Shot, Move::Goal, 15);
        assert_eq!(t.next_holder, Side::Home);
        assert_eq!(state.phase, Phase::Kickoff);
        assert!(state.momentum.away > 0.0);
        assert!(state.momentum.home < 0.0);
    }

    #[test]
    fn momentum_stays_bounded_and_decays() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        state.momentum = PerSide::new(5.0, -5.0);
        engine
            .play_minute(&mut state, &mut MinuteRng::resume(3, 0))
            .unwrap();
        assert!((-1.0..=1.0).contains(&state.momentum.home));
        assert!((-1.0..=1.0).contains(&state.momentum.away));
    }

    #[test]
    fn non_finite_momentum_is_reset() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        state.momentum = PerSide::new(f32::NAN, f32::NEG_INFINITY);
        engine
            .play_minute(&mut state, &mut MinuteRng::resume(3, 0))
            .unwrap();
        assert!(state.momentum.home.is_finite());
        assert!(state.momentum.away.is_finite());
    }

    #[test]
    fn second_half_kicked_off_by_other_side() {
        let engine = TransitionEngine::default();
        let mut state = kickoff_state();
        state.minute = 45;
        state.phase = Phase::Buildup;
        let trace = engine
            .play_minute(&mut state, &mut MinuteRng::resume(8, 500))
            .unwrap();
        assert_eq!(trace.start_phase, Phase::Kickoff);
        assert_eq!(trace.start_holder, Side::Away);
    }

    #[test]
    fn edge_favours_stronger_side() {
        let mut state = kickoff_state();
        state.strength = PerSide::new(80, 40);
        assert!(edge(&state, Side::Home) > 0.0);
        assert!(edge(&state, Side::Away) < 0.0);
        state.momentum = PerSide::new(1.0, -1.0);
        assert_eq!(edge(&state, Side::Home), 1.0);
    }

    #[test]
    fn bias_tilts_weights_without_zeroing() {
        let table = TransitionTable::v0();
        let (row, strong) = table.biased_row(Phase::Buildup, 1.0).unwrap();
        let (_, weak) = table.biased_row(Phase::Buildup, -1.0).unwrap();
        for (i, (mv, _)) in row.iter().enumerate() {
            assert!(strong[i] > 0.0 && weak[i] > 0.0);
            if *mv == Move::Turnover {
                assert!(strong[i] < weak[i]);
            }
        }
    }

    #[test]
    fn ron_round_trip() {
        let table = TransitionTable::v0();
        let serialized = ron::to_string(&table).unwrap();
        let parsed = TransitionTable::parse_ron(&serialized).unwrap();
        assert_eq!(parsed.version, table.version);
        assert_eq!(parsed.rows.len(), table.rows.len());
    }

    #[test]
    fn save_and_load_table() {
        let table = TransitionTable::v0();
        let path = std::path::PathBuf::from("target/test_transition_table.ron");
        let _ = std::fs::create_dir_all("target");

        save_table(&table, &path).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.step_weights, table.step_weights);

        let _ = std::fs::remove_file(&path);
    }
}
