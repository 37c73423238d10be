//! Recommendation settings.
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `kappa` | 2.5 | UCB exploration weight |
//! | `alpha` | 1e-3 | Jitter / observation noise on the covariance diagonal |
//! | `n_restarts` | 5 | Random restarts of the GP hyperparameter search |
//! | `random_seed` | 1 | Seed of every random draw in a request |
//! | `allow_duplicate_points` | true | Keep repeated points instead of skipping them |
//! | `acquisition` | UCB(`kappa`) | Acquisition function override |
//! | `default_target` | `Some(0.0)` | Target for records without the primary metric; `None` drops them |
//! | `n_warmup` | 10 000 | Random acquisition evaluations before local search |
//! | `n_grid` | 256 | Sobol acquisition evaluations before local search |
//! | `n_local_starts` | 10 | Local searches per suggestion |
//! | `max_local_iterations` | 100 | Iteration cap per local search (GP fit and acquisition) |
//! | `grid_resolution` | 1000 | Diagnostic curve resolution |
//!
//! The configuration deserializes from JSON with every field optional:
//!
//! ```
//! use nextpoint::AdvisorConfig;
//!
//! let config: AdvisorConfig =
//!     serde_json::from_str(r#"{ "kappa": 5.0, "allow_duplicate_points": false }"#).unwrap();
//! assert_eq!(config.kappa, 5.0);
//! assert_eq!(config.n_restarts, 5);
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};

use crate::acquisition::{AcquisitionKind, DEFAULT_KAPPA};
use crate::diagnostics::DEFAULT_GRID_RESOLUTION;
use crate::error::{Error, Result};
use crate::gp::{DEFAULT_ALPHA, DEFAULT_N_RESTARTS, GaussianProcess};
use crate::observation::DEFAULT_FALLBACK_TARGET;
use crate::suggest::{
    DEFAULT_N_GRID, DEFAULT_N_LOCAL_STARTS, DEFAULT_N_WARMUP, DEFAULT_SEED, Suggester,
};

/// Settings for one recommendation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// UCB exploration weight.
    pub kappa: f64,
    /// Covariance diagonal jitter.
    pub alpha: f64,
    /// GP hyperparameter restarts.
    pub n_restarts: usize,
    /// Seed of all random draws.
    pub random_seed: u64,
    /// Keep repeated points.
    pub allow_duplicate_points: bool,
    /// Acquisition override; `None` means UCB with `kappa`.
    pub acquisition: Option<AcquisitionKind>,
    /// Fallback target for records without the primary metric.
    pub default_target: Option<f64>,
    /// Random warm-up evaluations.
    pub n_warmup: usize,
    /// Sobol warm-up evaluations.
    pub n_grid: usize,
    /// Local searches per suggestion.
    pub n_local_starts: usize,
    /// Iteration cap per local search.
    pub max_local_iterations: usize,
    /// Diagnostic grid resolution.
    pub grid_resolution: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            kappa: DEFAULT_KAPPA,
            alpha: DEFAULT_ALPHA,
            n_restarts: DEFAULT_N_RESTARTS,
            random_seed: DEFAULT_SEED,
            allow_duplicate_points: true,
            acquisition: None,
            default_target: Some(DEFAULT_FALLBACK_TARGET),
            n_warmup: DEFAULT_N_WARMUP,
            n_grid: DEFAULT_N_GRID,
            n_local_starts: DEFAULT_N_LOCAL_STARTS,
            max_local_iterations: 100,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
        }
    }
}

impl AdvisorConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> AdvisorConfigBuilder {
        AdvisorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> Result<()> {
            Err(Error::InvalidConfig {
                field,
                reason: reason.into(),
            })
        }

        if !self.kappa.is_finite() || self.kappa < 0.0 {
            return invalid("kappa", format!("{} must be finite and non-negative", self.kappa));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return invalid("alpha", format!("{} must be finite and non-negative", self.alpha));
        }
        if self.default_target.is_some_and(|t| !t.is_finite()) {
            return invalid("default_target", "must be finite");
        }
        if let Some(kind) = self.acquisition {
            let ok = match kind {
                AcquisitionKind::UpperConfidenceBound { kappa } => kappa.is_finite() && kappa >= 0.0,
                AcquisitionKind::ExpectedImprovement { xi }
                | AcquisitionKind::ProbabilityOfImprovement { xi } => xi.is_finite(),
            };
            if !ok {
                return invalid("acquisition", "parameters must be finite (kappa non-negative)");
            }
        }
        if self.n_warmup == 0 && self.n_grid == 0 && self.n_local_starts == 0 {
            return invalid(
                "n_warmup",
                "at least one of n_warmup, n_grid, n_local_starts must be positive",
            );
        }
        if self.grid_resolution < 2 {
            return invalid("grid_resolution", "must be at least 2");
        }
        Ok(())
    }

    /// The acquisition function in effect.
    #[must_use]
    pub fn acquisition_kind(&self) -> AcquisitionKind {
        self.acquisition
            .unwrap_or(AcquisitionKind::UpperConfidenceBound { kappa: self.kappa })
    }

    /// The surrogate configured from these settings.
    #[must_use]
    pub fn gaussian_process(&self) -> GaussianProcess {
        GaussianProcess::builder()
            .alpha(self.alpha)
            .n_restarts(self.n_restarts)
            .seed(self.random_seed)
            .max_iterations(self.max_local_iterations)
            .build()
    }

    /// The acquisition optimizer configured from these settings.
    #[must_use]
    pub fn suggester(&self) -> Suggester {
        Suggester::builder()
            .n_warmup(self.n_warmup)
            .n_grid(self.n_grid)
            .n_local_starts(self.n_local_starts)
            .max_iterations(self.max_local_iterations)
            .seed(self.random_seed)
            .build()
    }
}

/// Builder for [`AdvisorConfig`].
///
/// # Examples
///
/// ```
/// use nextpoint::AdvisorConfig;
///
/// let config = AdvisorConfig::builder()
///     .kappa(0.5)
///     .random_seed(7)
///     .allow_duplicate_points(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.random_seed, 7);
///
/// assert!(AdvisorConfig::builder().alpha(-1.0).build().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct AdvisorConfigBuilder {
    config: AdvisorConfig,
}

impl AdvisorConfigBuilder {
    /// Sets the UCB exploration weight.
    #[must_use]
    pub fn kappa(mut self, kappa: f64) -> Self {
        self.config.kappa = kappa;
        self
    }

    /// Sets the covariance diagonal jitter.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Sets the number of GP hyperparameter restarts.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.config.n_restarts = n;
        self
    }

    /// Sets the seed of all random draws.
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Sets whether repeated points are kept.
    #[must_use]
    pub fn allow_duplicate_points(mut self, allow: bool) -> Self {
        self.config.allow_duplicate_points = allow;
        self
    }

    /// Overrides the acquisition function.
    #[must_use]
    pub fn acquisition(mut self, kind: AcquisitionKind) -> Self {
        self.config.acquisition = Some(kind);
        self
    }

    /// Sets the fallback target; `None` drops records without the primary metric.
    #[must_use]
    pub fn default_target(mut self, target: Option<f64>) -> Self {
        self.config.default_target = target;
        self
    }

    /// Sets the number of random warm-up evaluations.
    #[must_use]
    pub fn n_warmup(mut self, n: usize) -> Self {
        self.config.n_warmup = n;
        self
    }

    /// Sets the number of Sobol warm-up evaluations.
    #[must_use]
    pub fn n_grid(mut self, n: usize) -> Self {
        self.config.n_grid = n;
        self
    }

    /// Sets the number of local searches per suggestion.
    #[must_use]
    pub fn n_local_starts(mut self, n: usize) -> Self {
        self.config.n_local_starts = n;
        self
    }

    /// Sets the iteration cap per local search.
    #[must_use]
    pub fn max_local_iterations(mut self, n: usize) -> Self {
        self.config.max_local_iterations = n;
        self
    }

    /// Sets the diagnostic grid resolution.
    #[must_use]
    pub fn grid_resolution(mut self, n: usize) -> Self {
        self.config.grid_resolution = n;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a field is out of range.
    pub fn build(self) -> Result<AdvisorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
