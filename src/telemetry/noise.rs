//! Multiplicative measurement noise for simulation and robustness testing.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use crate::types::RawSample;

/// Scales each altitude by a factor drawn from `uniform(1 - error, 1 + error)`.
#[derive(Debug, Clone)]
pub struct NoiseInjector {
    rng: StdRng,
    factor: Uniform<f64>,
    error: f64,
}

impl NoiseInjector {
    /// `None` when `error` is zero (or not a positive number): noise disabled.
    /// Without a seed the generator is seeded from entropy.
    pub fn new(error: f64, seed: Option<u64>) -> Option<Self> {
        if !(error > 0.0 && error.is_finite()) {
            return None;
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Some(Self {
            rng,
            factor: Uniform::new_inclusive(1.0 - error, 1.0 + error),
            error,
        })
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    /// Perturb the altitude; time passes through untouched.
    pub fn apply(&mut self, sample: RawSample) -> RawSample {
        RawSample {
            time: sample.time,
            altitude: sample.altitude * self.factor.sample(&mut self.rng),
        }
    }
}
