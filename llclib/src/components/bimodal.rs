//! The rare-exception coin used by bimodal insertion (BRRIP, BIP).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Where the bimodal exceptions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BimodalSource {
    /// A seeded generator, reproducible for a given seed
    Random { seed: u64 },
    /// Exactly every Nth throw comes up, starting with the first
    Periodic,
}

impl Default for BimodalSource {
    fn default() -> Self {
        BimodalSource::Random { seed: 0x5EED }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Random(SmallRng),
    Periodic(u32),
}

#[derive(Debug, Clone)]
pub struct BimodalCoin {
    source: Source,
    one_in: u32,
}

impl BimodalCoin {
    pub fn new(source: BimodalSource, one_in: u32) -> Self {
        let source = match source {
            BimodalSource::Random { seed } => Source::Random(SmallRng::seed_from_u64(seed)),
            BimodalSource::Periodic => Source::Periodic(0),
        };
        Self { source, one_in }
    }

    /// True roughly (or, for [`BimodalSource::Periodic`], exactly) once every `one_in` throws
    pub fn throw(&mut self) -> bool {
        match &mut self.source {
            Source::Random(rng) => rng.gen_ratio(1, self.one_in),
            Source::Periodic(count) => {
                let up = *count == 0;
                *count = (*count + 1) % self.one_in;
                up
            }
        }
    }
}
