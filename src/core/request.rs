/// Minute request — the query parameters of one polling call.

use std::collections::HashMap;

use crate::core::pipeline::StreamError;
use crate::schema::side::{PerSide, TeamNames};
use crate::schema::state::{DEFAULT_STRENGTH, MAX_STRENGTH, MIN_STRENGTH};

/// Parsed and validated inputs for `MatchStream::next_minute`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteRequest {
    pub teams: TeamNames,
    pub seed: u64,
    /// Absent for the first minute.
    pub token: Option<String>,
    /// Only read when starting a match; later minutes use the token's.
    pub strength: PerSide<u8>,
    pub rosters: PerSide<Vec<String>>,
}

impl MinuteRequest {
    /// A first-minute request with default names and strengths.
    pub fn new(seed: u64) -> Self {
        Self {
            teams: TeamNames::default(),
            seed,
            token: None,
            strength: PerSide::new(DEFAULT_STRENGTH, DEFAULT_STRENGTH),
            rosters: PerSide::default(),
        }
    }

    pub fn teams(mut self, home: &str, away: &str) -> Self {
        self.teams = TeamNames::new(home, away);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn strength(mut self, home: u8, away: u8) -> Self {
        self.strength = PerSide::new(home, away);
        self
    }

    pub fn rosters(mut self, home: Vec<String>, away: Vec<String>) -> Self {
        self.rosters = PerSide::new(home, away);
        self
    }

    /// Build a request from raw query parameters.
    ///
    /// `seed` is required and must be an integer (negative values are
    /// accepted and reinterpreted as unsigned). An empty `token` counts as
    /// absent. Missing team names fall back to "Home"/"Away".
    pub fn from_query(params: &HashMap<String, String>) -> Result<MinuteRequest, StreamError> {
        let seed = parse_seed(params.get("seed").map(String::as_str).unwrap_or_default())?;
        let defaults = TeamNames::default();
        let home = non_empty(params, "home").unwrap_or(defaults.home.as_str());
        let away = non_empty(params, "away").unwrap_or(defaults.away.as_str());

        let mut request = MinuteRequest::new(seed).teams(home, away);
        request.token = non_empty(params, "token").map(str::to_string);
        request.strength = PerSide::new(
            parse_strength(params, "home_strength")?,
            parse_strength(params, "away_strength")?,
        );
        request.rosters = PerSide::new(
            parse_roster(params, "home_roster"),
            parse_roster(params, "away_roster"),
        );
        Ok(request)
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parse a match seed. Negative integers wrap to their unsigned bit pattern.
pub fn parse_seed(raw: &str) -> Result<u64, StreamError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StreamError::InvalidSeed("seed is required".to_string()));
    }
    raw.parse::<u64>()
        .or_else(|_| raw.parse::<i64>().map(|v| v as u64))
        .map_err(|_| StreamError::InvalidSeed(format!("'{raw}' is not an integer")))
}

fn parse_strength(params: &HashMap<String, String>, name: &str) -> Result<u8, StreamError> {
    let Some(raw) = non_empty(params, name) else {
        return Ok(DEFAULT_STRENGTH);
    };
    match raw.parse::<u8>() {
        Ok(value) if (MIN_STRENGTH..=MAX_STRENGTH).contains(&value) => Ok(value),
        _ => Err(StreamError::InvalidParameter {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_roster(params: &HashMap<String, String>, name: &str) -> Vec<String> {
    non_empty(params, name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|player| !player.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn full_query_parses() {
        let request = MinuteRequest::from_query(&query(&[
            ("home", "Rovers"),
            ("away", "United"),
            ("seed", "42"),
            ("token", "abc"),
            ("home_strength", "70"),
            ("home_roster", "Ann, Bo ,,Cy"),
        ]))
        .unwrap();

        assert_eq!(request.teams, TeamNames::new("Rovers", "United"));
        assert_eq!(request.seed, 42);
        assert_eq!(request.token.as_deref(), Some("abc"));
        assert_eq!(request.strength, PerSide::new(70, DEFAULT_STRENGTH));
        assert_eq!(request.rosters.home, vec!["Ann", "Bo", "Cy"]);
        assert!(request.rosters.away.is_empty());
    }

    #[test]
    fn empty_token_means_new_match() {
        let request = MinuteRequest::from_query(&query(&[("seed", "1"), ("token", "")])).unwrap();
        assert_eq!(request.token, None);
        assert_eq!(request.teams, TeamNames::default());
    }

    #[test]
    fn missing_or_bad_seed_fails() {
        assert!(matches!(
            MinuteRequest::from_query(&query(&[("home", "A")])),
            Err(StreamError::InvalidSeed(_))
        ));
        assert!(matches!(
            MinuteRequest::from_query(&query(&[("seed", "forty-two")])),
            Err(StreamError::InvalidSeed(_))
        ));
    }

    #[test]
    fn negative_seed_is_accepted() {
        let request = MinuteRequest::from_query(&query(&[("seed", "-1")])).unwrap();
        assert_eq!(request.seed, u64::MAX);
    }

    #[test]
    fn out_of_range_strength_fails() {
        let err = MinuteRequest::from_query(&query(&[("seed", "1"), ("away_strength", "150")]))
            .unwrap_err();
        assert!(matches!(err, StreamError::InvalidParameter { ref name, .. } if name == "away_strength"));
    }

    #[test]
    fn parse_seed_directly() {
        assert_eq!(parse_seed(" 42 ").unwrap(), 42);
        assert_eq!(parse_seed("-2").unwrap(), u64::MAX - 1);
        assert!(matches!(parse_seed(""), Err(StreamError::InvalidSeed(_))));
        assert!(matches!(parse_seed("4x"), Err(StreamError::InvalidSeed(_))));
    }
}
