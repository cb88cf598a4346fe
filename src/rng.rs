use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generator handed to every tick phase.
pub type DaisyRng = ChaCha8Rng;

/// Named deterministic random streams for one run.
///
/// A stream's key depends only on the run seed and the stream name, so the
/// order in which phases first ask for their streams never changes a draw.
pub struct RngManager {
    seed: u64,
    streams: HashMap<String, DaisyRng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The persistent stream for `name`, created on first use.
    pub fn stream(&mut self, name: &str) -> &mut DaisyRng {
        let seed = self.seed;
        self.streams
            .entry(name.to_string())
            .or_insert_with(|| DaisyRng::seed_from_u64(stream_key(seed, name)))
    }
}

// FNV-1a over the stream name, started from the run seed.
fn stream_key(seed: u64, name: &str) -> u64 {
    name.bytes()
        .fold(seed ^ 0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
        })
}
