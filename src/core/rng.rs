/// Seed/RNG deriver — the deterministic random stream behind each minute.
///
/// A minute's randomness is a window of a ChaCha8 keystream keyed by the
/// match seed. The window starts at the state's `rng_cursor` (a word
/// offset) and whatever the minute consumes moves the cursor forward, so
/// a `(seed, cursor)` pair always replays the same draws in any process.

use rand::{Error, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::hash::{Hash, Hasher};

use crate::schema::side::Side;

/// Keystream used for match play.
const MATCH_STREAM: u64 = 0;
/// Keystream used only for the opening coin flip.
const KICKOFF_STREAM: u64 = 1;

/// Seekable random source for one minute of play.
#[derive(Debug, Clone)]
pub struct MinuteRng {
    inner: ChaCha8Rng,
}

impl MinuteRng {
    /// Position the match stream for `match_seed` at `cursor`.
    pub fn resume(match_seed: u64, cursor: u64) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(match_seed);
        inner.set_stream(MATCH_STREAM);
        inner.set_word_pos(u128::from(cursor));
        Self { inner }
    }

    /// Word offset to resume from after this minute's draws.
    pub fn cursor(&self) -> u64 {
        u64::try_from(self.inner.get_word_pos()).unwrap_or(u64::MAX)
    }

    /// Side that kicks off the match, a coin flip derived from the seed alone.
    pub fn kickoff_side(match_seed: u64) -> Side {
        let mut flip = ChaCha8Rng::seed_from_u64(match_seed);
        flip.set_stream(KICKOFF_STREAM);
        if flip.next_u32() & 1 == 0 {
            Side::Home
        } else {
            Side::Away
        }
    }
}

impl RngCore for MinuteRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Stable hash of `parts`, for choices that must not consume match randomness.
///
/// Integers are fed little-endian at fixed width (`usize` as 64 bits), so
/// the result is the same on every platform.
pub fn stable_hash<T: Hash>(parts: T) -> u64 {
    let mut hasher = StableHasher::default();
    parts.hash(&mut hasher);
    hasher.finish()
}

/// `Hasher` over SHA-256 with a platform-independent byte encoding.
#[derive(Default)]
struct StableHasher {
    digest: Sha256,
}

impl Hasher for StableHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    fn write_u16(&mut self, n: u16) {
        self.write(&n.to_le_bytes());
    }

    fn write_u32(&mut self, n: u32) {
        self.write(&n.to_le_bytes());
    }

    fn write_u64(&mut self, n: u64) {
        self.write(&n.to_le_bytes());
    }

    fn write_u128(&mut self, n: u128) {
        self.write(&n.to_le_bytes());
    }

    fn write_usize(&mut self, n: usize) {
        self.write_u64(n as u64);
    }

    fn finish(&self) -> u64 {
        let digest = self.digest.clone().finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(word)
    }
}
