/// Event and statistics aggregation for one minute's walk.
///
/// Everything here only ever adds: counters in `MatchState` grow, events
/// are appended in step order.

use crate::core::markov::{MinuteTrace, Move};
use crate::schema::event::{EventKind, MatchEvent};
use crate::schema::phase::Phase;
use crate::schema::side::{PerSide, Side, TeamNames};
use crate::schema::state::MatchState;

/// What one minute added to the match.
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteTally {
    /// The minute played (1-based).
    pub minute: u16,
    pub events: Vec<MatchEvent>,
    pub possession_seconds: PerSide<u32>,
    pub possession_swings: u32,
    pub entries_final_third: PerSide<u16>,
    pub score_delta: PerSide<u16>,
}

/// Fold `trace` into the counters of `state` and list the minute's events.
/// `state.minute` still holds the minutes played before this one.
pub fn aggregate(state: &mut MatchState, trace: &MinuteTrace, teams: &TeamNames) -> MinuteTally {
    let minute = state.minute.saturating_add(1);
    let half = match state.half_time() {
        Some(half_time) if state.minute >= half_time => 2,
        _ => 1,
    };
    // A kickoff opening the minute only starts a half at 0' and half-time.
    let opens_half = state.minute == 0 || state.half_time() == Some(state.minute);

    let mut tally = MinuteTally {
        minute,
        events: Vec::new(),
        possession_seconds: PerSide::default(),
        possession_swings: 0,
        entries_final_third: PerSide::default(),
        score_delta: PerSide::default(),
    };

    for (index, t) in trace.transitions.iter().enumerate() {
        let holder = t.holder;
        let opponent = holder.opponent();

        *tally.possession_seconds.get_mut(holder) += t.seconds;
        let total = state.possession_seconds.get_mut(holder);
        *total = total.saturating_add(t.seconds);

        if t.next_holder != holder {
            tally.possession_swings += 1;
        }

        if t.from == Phase::Kickoff {
            let restart = index > 0 || !opens_half;
            push(&mut tally, teams, holder, EventKind::Kickoff { half, restart });
        }

        match t.mv {
            Move::Keep(Phase::FinalThirdEntry) => {
                *tally.entries_final_third.get_mut(holder) += 1;
                bump(state.entries_final_third.get_mut(holder));
                push(&mut tally, teams, holder, EventKind::FinalThirdEntry);
            }
            Move::Keep(_) => {}
            Move::Turnover => {
                push(&mut tally, teams, opponent, EventKind::PossessionSwing);
            }
            Move::Foul => {
                bump(state.fouls.get_mut(opponent));
                push(&mut tally, teams, opponent, EventKind::Foul);
            }
            Move::Injury => {
                push(&mut tally, teams, holder, EventKind::Injury);
            }
            Move::Goal => {
                record_shot(state, holder, true);
                *tally.score_delta.get_mut(holder) += 1;
                bump(state.score.get_mut(holder));
                push(
                    &mut tally,
                    teams,
                    holder,
                    EventKind::Goal { score: state.score },
                );
            }
            Move::SavedCorner | Move::SavedHeld => {
                record_shot(state, holder, true);
                let corner = t.mv == Move::SavedCorner;
                push(&mut tally, teams, holder, EventKind::ShotSaved { corner });
            }
            Move::Miss => {
                record_shot(state, holder, false);
                push(&mut tally, teams, holder, EventKind::ShotMissed);
            }
        }

        if t.milestone {
            push(
                &mut tally,
                teams,
                holder,
                EventKind::PassStreak { passes: t.streak },
            );
        }
    }

    tally
}

fn bump(counter: &mut u16) {
    *counter = counter.saturating_add(1);
}

fn record_shot(state: &mut MatchState, side: Side, on_target: bool) {
    bump(state.shots.get_mut(side));
    if on_target {
        bump(state.shots_on_target.get_mut(side));
    }
}

fn push(tally: &mut MinuteTally, teams: &TeamNames, team: Side, kind: EventKind) {
    let description = describe(&kind, teams.name(team));
    tally.events.push(MatchEvent {
        minute: tally.minute,
        team,
        kind,
        description,
        player: None,
    });
}

/// Plain factual description of an event.
pub fn describe(kind: &EventKind, team: &str) -> String {
    match kind {
        EventKind::Kickoff { restart: true, .. } => format!("{team} restart after the goal"),
        EventKind::Kickoff { half: 1, .. } => format!("{team} kick off the first half"),
        EventKind::Kickoff { .. } => format!("{team} kick off the second half"),
        EventKind::PassStreak { passes } => format!("{team} string {passes} passes together"),
        EventKind::FinalThirdEntry => format!("{team} enter the final third"),
        EventKind::PossessionSwing => format!("{team} win possession"),
        EventKind::ShotSaved { corner: true } => format!("Shot by {team} saved, corner"),
        EventKind::ShotSaved { corner: false } => format!("Shot by {team} saved"),
        EventKind::ShotMissed => format!("Shot by {team} off target"),
        EventKind::Goal { score } => {
            format!("Goal for {team} ({}-{})", score.home, score.away)
        }
        EventKind::Foul => format!("Foul by {team}"),
        EventKind::Injury => format!("{team} player down injured"),
    }
}
