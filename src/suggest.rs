//! Multi-start maximization of the acquisition function.
//!
//! # Algorithm overview
//!
//! 1. **Warm-up**: the acquisition is evaluated at `n_warmup` seeded
//!    uniform random points followed by `n_grid` points of a scrambled
//!    Sobol sequence, all in the unit cube.
//! 2. **Local search**: the `n_local_starts` best warm-up points (highest
//!    utility first, earlier candidates first on ties) seed the projected
//!    BFGS of [`crate::local`] on the negated acquisition, with
//!    finite-difference gradients.
//! 3. **Select**: the best warm-up point and every local optimum compete;
//!    the highest utility wins and ties go to the earliest found.
//!
//! All randomness comes from the configured seed, so identical surrogate
//! state yields a bit-identical suggestion. The returned point is mapped
//! back to raw units and clamped into the declared bounds.

use crate::acquisition::FittedAcquisition;
use crate::error::{Error, Result};
use crate::local::{LocalSearch, numerical_gradient};
use crate::rng_util;

/// Default number of random warm-up evaluations.
pub const DEFAULT_N_WARMUP: usize = 10_000;
/// Default number of Sobol warm-up evaluations.
pub const DEFAULT_N_GRID: usize = 256;
/// Default number of local searches.
pub const DEFAULT_N_LOCAL_STARTS: usize = 10;
/// Default seed.
pub const DEFAULT_SEED: u64 = 1;

/// Highest dimension supported by the Sobol tables.
const MAX_SOBOL_DIMS: usize = 256;
/// Finite-difference step in unit-cube coordinates.
const GRADIENT_STEP: f64 = 1e-7;
/// Stream id separating the Sobol scramble seed from the warm-up RNG.
const SOBOL_STREAM: u64 = 0x50b0;

/// The arg-max found by a [`Suggester`].
#[derive(Clone, Debug, PartialEq)]
pub struct Suggestion {
    /// Point in raw parameter units, inside the bounds.
    pub point: Vec<f64>,
    /// Same point in unit-cube coordinates.
    pub unit: Vec<f64>,
    /// Acquisition utility at the point.
    pub acquisition_value: f64,
    /// Number of local searches that ran to completion.
    pub n_local_runs: usize,
}

/// Multi-start acquisition optimizer.
///
/// # Examples
///
/// ```
/// use nextpoint::Suggester;
///
/// let suggester = Suggester::builder()
///     .n_warmup(1_000)
///     .n_local_starts(5)
///     .seed(42)
///     .build();
/// assert_eq!(suggester.seed(), 42);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Suggester {
    n_warmup: usize,
    n_grid: usize,
    n_local_starts: usize,
    search: LocalSearch,
    seed: u64,
}

impl Default for Suggester {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Suggester {
    /// Creates a builder for configuring a `Suggester`.
    #[must_use]
    pub fn builder() -> SuggesterBuilder {
        SuggesterBuilder::default()
    }

    /// The seed of the warm-up draws.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Find the point maximizing `acquisition` within the model's space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptimizationFailed`] if the acquisition is not
    /// finite at any candidate.
    pub fn suggest(&self, acquisition: &FittedAcquisition<'_>) -> Result<Suggestion> {
        let space = acquisition.model().space();
        let dim = space.dim();
        let lower = vec![0.0; dim];
        let upper = vec![1.0; dim];

        let candidates = self.warmup_candidates(dim);
        let mut scored: Vec<(usize, f64)> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (i, acquisition.value_unit(c)))
            .filter(|(_, v)| v.is_finite())
            .collect();

        let mut best: Option<(Vec<f64>, f64)> = scored
            .iter()
            .copied()
            .reduce(|a, b| if b.1 > a.1 { b } else { a })
            .map(|(i, v)| (candidates[i].clone(), v));

        // Stable: equal utilities keep candidate order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.n_local_starts);

        let mut n_local_runs = 0;
        let mut failures = Vec::new();
        for &(i, _) in &scored {
            let mut negated = |x: &[f64]| -acquisition.value_unit(x);
            let objective = |x: &[f64]| {
                let f = negated(x);
                let g = numerical_gradient(&mut negated, x, &lower, &upper, GRADIENT_STEP)?;
                Some((f, g))
            };
            match self.search.minimize(&candidates[i], &lower, &upper, objective) {
                Ok(opt) => {
                    n_local_runs += 1;
                    let value = -opt.value;
                    if best.as_ref().is_none_or(|(_, b)| value > *b) {
                        best = Some((opt.point, value));
                    }
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        let Some((unit, acquisition_value)) = best else {
            let cause = failures
                .first()
                .cloned()
                .unwrap_or_else(|| "acquisition is not finite at any candidate".to_owned());
            return Err(Error::optimization_failed(cause));
        };

        let unit: Vec<f64> = unit.iter().map(|u| u.clamp(0.0, 1.0)).collect();
        let point = space.denormalize(&unit);
        trace_info!(
            acquisition = acquisition.name(),
            acquisition_value,
            n_local_runs,
            "suggestion found"
        );

        Ok(Suggestion {
            point,
            unit,
            acquisition_value,
            n_local_runs,
        })
    }

    /// Random warm-up points followed by Sobol points, in start order.
    #[allow(clippy::cast_possible_truncation)]
    fn warmup_candidates(&self, dim: usize) -> Vec<Vec<f64>> {
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let mut candidates: Vec<Vec<f64>> = (0..self.n_warmup)
            .map(|_| rng_util::unit_point(&mut rng, dim))
            .collect();

        if dim <= MAX_SOBOL_DIMS {
            let scramble = rng_util::derive_seed(self.seed, SOBOL_STREAM);
            candidates.extend((0..self.n_grid).map(|i| {
                (0..dim)
                    .map(|d| f64::from(sobol_burley::sample(i as u32, d as u32, scramble)))
                    .collect()
            }));
        }

        if candidates.is_empty() {
            candidates.push(vec![0.5; dim]);
        }
        candidates
    }
}

/// Builder for configuring a [`Suggester`].
///
/// All options have sensible defaults:
/// - `n_warmup`: 10 000
/// - `n_grid`: 256
/// - `n_local_starts`: 10
/// - `max_iterations`: 100
/// - `seed`: 1
#[derive(Debug, Clone, Default)]
pub struct SuggesterBuilder {
    n_warmup: Option<usize>,
    n_grid: Option<usize>,
    n_local_starts: Option<usize>,
    max_iterations: Option<usize>,
    seed: Option<u64>,
}

impl SuggesterBuilder {
    /// Sets the number of random warm-up evaluations.
    #[must_use]
    pub fn n_warmup(mut self, n: usize) -> Self {
        self.n_warmup = Some(n);
        self
    }

    /// Sets the number of Sobol warm-up evaluations.
    #[must_use]
    pub fn n_grid(mut self, n: usize) -> Self {
        self.n_grid = Some(n);
        self
    }

    /// Sets how many of the best warm-up points seed a local search.
    #[must_use]
    pub fn n_local_starts(mut self, n: usize) -> Self {
        self.n_local_starts = Some(n);
        self
    }

    /// Sets the iteration cap of each local search.
    #[must_use]
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the configured [`Suggester`].
    #[must_use]
    pub fn build(self) -> Suggester {
        Suggester {
            n_warmup: self.n_warmup.unwrap_or(DEFAULT_N_WARMUP),
            n_grid: self.n_grid.unwrap_or(DEFAULT_N_GRID),
            n_local_starts: self.n_local_starts.unwrap_or(DEFAULT_N_LOCAL_STARTS),
            search: self
                .max_iterations
                .map_or_else(LocalSearch::default, LocalSearch::with_max_iterations),
            seed: self.seed.unwrap_or(DEFAULT_SEED),
        }
    }
}
