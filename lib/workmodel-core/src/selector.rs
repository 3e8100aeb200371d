//! Weighted function selection.

use rand::{Rng as _, RngCore};
use tracing::{debug, warn};

use crate::catalog::Pool;

// Probability sums and interval widths are rounded to this many fractional digits so that floating-point drift does not
// leave a gap at the top of the unit interval.
const PROBABILITY_SCALE: f64 = 1e10;

/// Rounds a probability to 10 fractional digits.
///
/// Values too large to scale are returned unchanged, as they have no fractional digits left to round.
pub fn round_probability(value: f64) -> f64 {
    let scaled = value * PROBABILITY_SCALE;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / PROBABILITY_SCALE
}

/// Draws functions from a pool with probability proportional to their weight.
///
/// Weights are normalized by their (rounded) sum, so they do not have to add up to 1. Functions are laid out along the
/// unit interval in pool order, and a single uniform draw picks the first function whose interval contains it.
///
/// Results are only reproducible if the underlying random source is seeded identically between runs.
pub struct WeightedSelector<R> {
    rng: R,
}

impl<R> WeightedSelector<R>
where
    R: RngCore,
{
    /// Creates a new `WeightedSelector` drawing from the given random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Selects a function from the pool on behalf of the given service.
    ///
    /// Returns `None` on a selection miss: the pool is empty, all weights are zero, or rounding left the draw above the
    /// last interval. Misses are logged but never treated as errors.
    pub fn select<'a>(&mut self, pool: &'a Pool, service: &str) -> Option<&'a str> {
        debug!(service, candidates = pool.len(), "Selecting internal service.");

        let total = round_probability(pool.probabilities().map(|(_, probability)| probability).sum());
        if total <= 0.0 {
            warn!(service, "Could not find an internal service: no candidate function has a positive probability.");
            return None;
        }

        let draw = self.rng.random::<f64>();
        let mut lower_bound = 0.0;
        for (function_id, probability) in pool.probabilities() {
            let share = probability / total;
            if draw <= lower_bound + share {
                debug!(service, function_id, "Selected internal service.");
                return Some(function_id);
            }
            lower_bound += round_probability(share);
        }

        warn!(service, draw, "Could not find an internal service: draw fell outside every interval.");
        None
    }
}
