//! Seeded draw stream backing propagation rolls.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Where a stream stands: its seed and how many draws it has produced.
///
/// A position replays to the same sequence only under the same `rand` release
/// and pointer width. `SmallRng` is free to change its algorithm between
/// either, so a saved position should not outlive the build that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPosition {
    pub seed: u64,
    pub draws: u64,
}

/// A uniform `[0, 1)` sequence seeded once.
///
/// The draw counter lets a host persist the stream as a [`StreamPosition`] and
/// later resume it at exactly the same point.
#[derive(Debug, Clone)]
pub struct DrawStream {
    rng: SmallRng,
    seed: u64,
    draws: u64,
}

impl DrawStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            seed,
            draws: 0,
        }
    }

    /// Rebuild a stream and fast-forward it to `position`.
    ///
    /// Every recorded draw is replayed, so this costs O(`position.draws`).
    pub fn resume(position: StreamPosition) -> Self {
        let mut stream = Self::new(position.seed);
        for _ in 0..position.draws {
            stream.next_unit();
        }
        stream
    }

    /// Next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    pub fn position(&self) -> StreamPosition {
        StreamPosition {
            seed: self.seed,
            draws: self.draws,
        }
    }
}
