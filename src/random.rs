//! Every simulation owns its random number generator. Nothing is seeded
//! globally, so replicates running side by side never share a stream and a
//! simulation reproduces exactly from its stored seed.

use log::trace;
use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::distr::Distribution;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Debug)]
pub struct SimRandom {
    /// `None` when the stream was seeded from OS entropy.
    seed: Option<u64>,
    rng: SmallRng,
}

impl SimRandom {
    pub fn seeded(seed: u64) -> Self {
        SimRandom {
            seed: Some(seed),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        SimRandom {
            seed: None,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Restarts the stream from `seed`, or from OS entropy when `seed` is `None`.
    pub fn reseed(&mut self, seed: Option<u64>) {
        trace!("reseeding random stream (seed={seed:?})");
        *self = match seed {
            Some(seed) => SimRandom::seeded(seed),
            None => SimRandom::from_entropy(),
        };
    }

    /// The seed the current stream started from.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Gets a random sample by applying `sampler` to the generator.
    pub fn sample<T>(&mut self, sampler: impl FnOnce(&mut SmallRng) -> T) -> T {
        sampler(&mut self.rng)
    }

    /// Gets a random sample from the specified distribution.
    pub fn sample_distr<T>(&mut self, distribution: impl Distribution<T>) -> T {
        distribution.sample(&mut self.rng)
    }

    /// Gets a random sample within the range provided by `range`.
    pub fn sample_range<S, T>(&mut self, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.rng.random_range(range)
    }

    /// Gets a random boolean value which is true with probability `p`.
    /// `p` is clamped to `[0, 1]`.
    pub fn sample_bool(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }
}
