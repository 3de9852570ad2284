/// State codec — the continuation token that carries `MatchState` between calls.
///
/// Token bytes are `[version][msgpack payload][tag]`, where the tag is the
/// first `TAG_LEN` bytes of HMAC-SHA256, keyed by the server secret, over
/// the match seed, the version byte and the payload. The bytes travel as
/// URL-safe base64 without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::core::rng::MinuteRng;
use crate::schema::side::PerSide;
use crate::schema::state::MatchState;

type HmacSha256 = Hmac<Sha256>;

/// Current token layout.
pub const TOKEN_VERSION: u8 = 1;
const TAG_LEN: usize = 16;

/// Key used when none is configured. Only fit for local play and tests.
pub const DEVELOPMENT_SECRET: &str = "markov-match development secret";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("token is truncated ({0} bytes)")]
    Truncated(usize),
    #[error("unsupported token version {0}")]
    UnsupportedVersion(u8),
    #[error("token checksum mismatch")]
    ChecksumMismatch,
    #[error("token payload could not be decoded: {0}")]
    Payload(#[from] rmp_serde::decode::Error),
    #[error("token state could not be encoded: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),
    #[error("token state is out of range: {0}")]
    Implausible(String),
    #[error("token signing key is unusable")]
    KeyInvalid,
    #[error("token was produced by transition model v{found}, this engine runs v{expected}")]
    UnsupportedModel { found: u8, expected: u8 },
}

/// Starting state for a match: minute 0, kickoff, zero counters, with the
/// kicking-off side decided by the seed.
pub fn initial(
    match_seed: u64,
    model_version: u8,
    regulation_minutes: u16,
    strength: PerSide<u8>,
) -> MatchState {
    MatchState::fresh(
        model_version,
        regulation_minutes,
        MinuteRng::kickoff_side(match_seed),
        strength,
    )
}

/// Signs and verifies tokens with one secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new(DEVELOPMENT_SECRET)
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Encode `state` into a token bound to `match_seed`.
    pub fn encode(&self, state: &MatchState, match_seed: u64) -> Result<String, TokenError> {
        let payload = rmp_serde::to_vec(state)?;

        let mut bytes = Vec::with_capacity(1 + payload.len() + TAG_LEN);
        bytes.push(TOKEN_VERSION);
        bytes.extend_from_slice(&payload);
        let tag = self.mac(match_seed, TOKEN_VERSION, &payload)?.finalize().into_bytes();
        bytes.extend_from_slice(&tag[..TAG_LEN]);

        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decode a token previously produced by `encode` with the same secret
    /// and seed.
    pub fn decode(&self, token: &str, match_seed: u64) -> Result<MatchState, TokenError> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim())?;
        if bytes.len() < 1 + TAG_LEN + 1 {
            return Err(TokenError::Truncated(bytes.len()));
        }

        let version = bytes[0];
        if version != TOKEN_VERSION {
            return Err(TokenError::UnsupportedVersion(version));
        }

        let (body, tag_bytes) = bytes.split_at(bytes.len() - TAG_LEN);
        let payload = &body[1..];
        self.mac(match_seed, version, payload)?
            .verify_truncated_left(tag_bytes)
            .map_err(|_| TokenError::ChecksumMismatch)?;

        let state: MatchState = rmp_serde::from_slice(payload)?;
        state.validate().map_err(TokenError::Implausible)?;
        Ok(state)
    }

    fn mac(&self, match_seed: u64, version: u8, payload: &[u8]) -> Result<HmacSha256, TokenError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::KeyInvalid)?;
        mac.update(&match_seed.to_be_bytes());
        mac.update(&[version]);
        mac.update(payload);
        Ok(mac)
    }
}
