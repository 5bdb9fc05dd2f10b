use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// RandMode controls random generator behaviour. May be predictable for testing or truly random for gameplay
pub enum RandMode {
    /// Seeded generator, reproducible for a given seed
    Predictable,
    /// Entropy-seeded generator
    RandomUniform,
    /// Counts 1, 2, ..., limit and wraps (small seeds from the story)
    Sequence { next: u16, limit: u16 },
}

pub struct ZRand {
    rng: StdRng,
    rand_mode: RandMode,
}

impl ZRand {
    pub fn new_uniform() -> ZRand {
        ZRand {
            rng: StdRng::seed_from_u64(rand::random::<u64>()),
            rand_mode: RandMode::RandomUniform,
        }
    }

    pub fn new_predictable(seed: u64) -> ZRand {
        ZRand {
            rng: StdRng::seed_from_u64(seed),
            rand_mode: RandMode::Predictable,
        }
    }

    /// Reseed in response to `random` with a negative argument.
    /// Seeds below 1000 switch to the counting sequence.
    pub fn seed(&mut self, seed: u16) {
        debug!("random: seeding with {}", seed);
        if seed < 1000 {
            self.rand_mode = RandMode::Sequence {
                next: 1,
                limit: seed.max(1),
            };
        } else {
            self.rng = StdRng::seed_from_u64(seed as u64);
            self.rand_mode = RandMode::Predictable;
        }
    }

    /// Reseed from entropy in response to `random 0`
    pub fn reseed_random(&mut self) {
        self.rng = StdRng::seed_from_u64(rand::random::<u64>());
        self.rand_mode = RandMode::RandomUniform;
    }

    /// Value in 1..=range, range must be positive
    pub fn gen_range(&mut self, range: u16) -> u16 {
        match &mut self.rand_mode {
            RandMode::Sequence { next, limit } => {
                let value = *next;
                *next = if *next >= *limit { 1 } else { *next + 1 };
                ((value - 1) % range) + 1
            }
            _ => self.rng.gen_range(1..=range),
        }
    }
}
