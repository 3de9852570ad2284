/// The minute pipeline: token → transition walk → events → narrative → token.
///
/// Wires together the state codec, RNG deriver, transition engine,
/// aggregator and commentary, and assembles the minute summary.

use std::path::Path;
use thiserror::Error;

use crate::core::codec::{self, TokenCodec, TokenError};
use crate::core::commentary::{Commentary, CommentaryError, NarrationContext};
use crate::core::markov::{self, MinuteTrace, TransitionEngine, TransitionError, TransitionTable};
use crate::core::request::MinuteRequest;
use crate::core::rng::{stable_hash, MinuteRng};
use crate::core::stats::{self, MinuteTally};
use crate::schema::event::MatchEvent;
use crate::schema::side::PerSide;
use crate::schema::state::{MatchState, DEFAULT_REGULATION_MINUTES};
use crate::schema::summary::{MinuteResponse, MinuteSummary};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("regulation ended: minute {minute} of {regulation_minutes} already played")]
    RegulationEnded { minute: u16, regulation_minutes: u16 },
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: String, value: String },
    #[error("could not encode continuation token: {0}")]
    Encoding(TokenError),
    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),
    #[error("commentary error: {0}")]
    Commentary(#[from] CommentaryError),
}

impl StreamError {
    /// Stable machine-readable code for error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "invalid_token",
            Self::RegulationEnded { .. } => "regulation_ended",
            Self::InvalidSeed(_) => "invalid_seed",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Encoding(_) | Self::Transition(_) | Self::Commentary(_) => "engine_error",
        }
    }

    /// The caller sent something that can never succeed as-is.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Encoding(_) | Self::Transition(_) | Self::Commentary(_)
        )
    }
}

/// The stateless minute engine. Built via `MatchStream::builder()`; holds
/// only immutable configuration, so one instance can serve every match.
#[derive(Debug, Clone)]
pub struct MatchStream {
    engine: TransitionEngine,
    commentary: Commentary,
    codec: TokenCodec,
    regulation_minutes: u16,
}

/// Builder for constructing a `MatchStream`.
pub struct MatchStreamBuilder {
    regulation_minutes: u16,
    commentary_path: Option<String>,
    table_path: Option<String>,
    /// Directly provided commentary (for testing without files).
    commentary: Option<Commentary>,
    /// Directly provided transition table (for testing without files).
    table: Option<TransitionTable>,
    /// Key for signing tokens. Every instance serving a match needs the same one.
    token_secret: Option<Vec<u8>>,
}

impl MatchStream {
    pub fn builder() -> MatchStreamBuilder {
        MatchStreamBuilder {
            regulation_minutes: DEFAULT_REGULATION_MINUTES,
            commentary_path: None,
            table_path: None,
            commentary: None,
            table: None,
            token_secret: None,
        }
    }

    /// Length of matches started by this stream.
    pub fn regulation_minutes(&self) -> u16 {
        self.regulation_minutes
    }

    pub fn model_version(&self) -> u8 {
        self.engine.table().version
    }

    /// The transition table this stream plays with.
    pub fn table(&self) -> &TransitionTable {
        self.engine.table()
    }

    /// Verify and decode a token issued by this stream for `seed`.
    pub fn decode_token(&self, token: &str, seed: u64) -> Result<MatchState, TokenError> {
        self.codec.decode(token, seed)
    }

    /// Produce the next minute of the match described by `request`.
    pub fn next_minute(&self, request: &MinuteRequest) -> Result<MinuteResponse, StreamError> {
        let mut state = self.resume(request)?;
        if state.is_finished() {
            return Err(StreamError::RegulationEnded {
                minute: state.minute,
                regulation_minutes: state.regulation_minutes,
            });
        }

        let score_before = state.score;
        let mut rng = MinuteRng::resume(request.seed, state.rng_cursor);
        let trace = self.engine.play_minute(&mut state, &mut rng)?;

        let mut tally = stats::aggregate(&mut state, &trace, &request.teams);
        attribute_players(&mut tally.events, &request.rosters, request.seed);

        let narrative = self.commentary.narrate(
            &tally.events,
            &NarrationContext {
                teams: &request.teams,
                minute: tally.minute,
                score_before,
            },
        );

        state.minute = tally.minute;
        state.rng_cursor = rng.cursor();
        let token = self
            .codec
            .encode(&state, request.seed)
            .map_err(StreamError::Encoding)?;

        log::debug!(
            "seed {} minute {}/{}: {} -> {}, {} events, score {}-{}",
            request.seed,
            state.minute,
            state.regulation_minutes,
            trace.start_phase,
            state.phase,
            tally.events.len(),
            state.score.home,
            state.score.away
        );

        Ok(assemble(&state, score_before, &trace, tally, narrative, token))
    }

    /// Decode the request's token, or start a new match when there is none.
    fn resume(&self, request: &MinuteRequest) -> Result<MatchState, StreamError> {
        let Some(token) = request.token.as_deref() else {
            return Ok(codec::initial(
                request.seed,
                self.model_version(),
                self.regulation_minutes,
                request.strength,
            ));
        };

        let state = self.codec.decode(token, request.seed).map_err(|err| {
            log::warn!("rejected token for seed {}: {}", request.seed, err);
            err
        })?;

        if state.model_version != self.model_version() {
            log::warn!(
                "rejected token for seed {}: model v{} != v{}",
                request.seed,
                state.model_version,
                self.model_version()
            );
            return Err(TokenError::UnsupportedModel {
                found: state.model_version,
                expected: self.model_version(),
            }
            .into());
        }
        Ok(state)
    }
}

/// Attach roster players to events by a stable hash of the seed, minute and
/// event position. Events keep `player: None` when the side has no roster.
fn attribute_players(events: &mut [MatchEvent], rosters: &PerSide<Vec<String>>, seed: u64) {
    for (index, event) in events.iter_mut().enumerate() {
        if !event.kind.takes_player() {
            continue;
        }
        let roster = rosters.get(event.team);
        if roster.is_empty() {
            continue;
        }
        let pick = stable_hash((seed, event.minute, index as u64)) % roster.len() as u64;
        event.player = Some(roster[pick as usize].clone());
    }
}

/// Package the minute into the response the caller sees.
fn assemble(
    state: &MatchState,
    score_before: PerSide<u16>,
    trace: &MinuteTrace,
    tally: MinuteTally,
    narrative: Vec<String>,
    token: String,
) -> MinuteResponse {
    MinuteResponse {
        regulation_minutes: state.regulation_minutes,
        minute_summary: MinuteSummary {
            minute: state.minute,
            start_state: trace.start_phase.name().to_string(),
            end_state: state.phase.name().to_string(),
            possession_end: state.possession,
            possession_pct: state.possession_pct(),
            possession_seconds: tally.possession_seconds,
            possession_seconds_total: state.possession_seconds,
            possession_swings: tally.possession_swings,
            entries_final_third: tally.entries_final_third,
            entries_final_third_total: state.entries_final_third,
            score: state.score.since(&score_before),
            score_total: state.score,
            shots_total: state.shots,
            shots_on_target_total: state.shots_on_target,
            fouls_total: state.fouls,
            momentum: state.momentum,
            events: tally.events,
            narrative,
            token,
        },
    }
}

impl MatchStreamBuilder {
    pub fn regulation_minutes(mut self, minutes: u16) -> Self {
        self.regulation_minutes = minutes;
        self
    }

    /// Commentary RON file merged over the built-in commentary.
    pub fn commentary_path(mut self, path: &str) -> Self {
        self.commentary_path = Some(path.to_string());
        self
    }

    /// Transition table RON file replacing the built-in model.
    pub fn table_path(mut self, path: &str) -> Self {
        self.table_path = Some(path.to_string());
        self
    }

    /// Provide commentary directly, replacing the built-in set.
    pub fn with_commentary(mut self, commentary: Commentary) -> Self {
        self.commentary = Some(commentary);
        self
    }

    /// Secret that signs and verifies continuation tokens.
    pub fn token_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.token_secret = Some(secret.as_ref().to_vec());
        self
    }

    /// Provide a transition table directly.
    pub fn with_table(mut self, table: TransitionTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn build(self) -> Result<MatchStream, StreamError> {
        if self.regulation_minutes == 0 {
            return Err(StreamError::InvalidParameter {
                name: "regulation_minutes".to_string(),
                value: "0".to_string(),
            });
        }

        let codec = match self.token_secret {
            Some(ref secret) if secret.is_empty() => {
                return Err(StreamError::InvalidParameter {
                    name: "token_secret".to_string(),
                    value: String::new(),
                });
            }
            Some(ref secret) => TokenCodec::new(secret),
            None => {
                log::warn!("no token secret configured; using the development secret");
                TokenCodec::default()
            }
        };

        let mut commentary = match self.commentary {
            Some(commentary) => commentary,
            None => Commentary::builtin()?,
        };
        if let Some(ref path) = self.commentary_path {
            commentary.merge(Commentary::load_from_ron(Path::new(path))?);
        }

        let table = if let Some(ref path) = self.table_path {
            markov::load_table(Path::new(path))?
        } else {
            let table = self.table.unwrap_or_default();
            table.validate()?;
            table
        };

        log::debug!(
            "match stream ready: model v{}, {} minutes, {} commentary rules",
            table.version,
            self.regulation_minutes,
            commentary.rules.len()
        );

        Ok(MatchStream {
            engine: TransitionEngine::new(table),
            commentary,
            codec,
            regulation_minutes: self.regulation_minutes,
        })
    }
}
