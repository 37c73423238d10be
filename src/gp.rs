//! Gaussian Process surrogate model.
//!
//! Fits a zero-mean GP with a [`Matern52`] ARD kernel to the observations
//! of an [`ObservationStore`] and predicts posterior mean and standard
//! deviation anywhere in the space.
//!
//! # Algorithm overview
//!
//! 1. **Standardize**: targets are shifted to zero mean and scaled to unit
//!    variance (a zero or undefined variance is treated as 1); inputs are
//!    mapped to the unit cube.
//! 2. **Select hyperparameters**: the log marginal likelihood is maximized
//!    over `[ln l_1, …, ln l_d, ln σ²]` inside fixed bounds with the
//!    projected BFGS of [`crate::local`], starting once from a default
//!    kernel and `n_restarts` more times from seeded log-uniform draws. The
//!    highest likelihood wins; the earliest start wins ties.
//! 3. **Factorize**: `K + alpha·I` is Cholesky-factorized. If that fails,
//!    the whole fit is retried once with a larger jitter before reporting
//!    [`Error::OptimizationFailed`].
//!
//! With no observations the model is the prior: mean 0 and standard
//! deviation `sqrt(σ²)` everywhere. With a single observation the default
//! kernel is kept, since the likelihood carries no length-scale information.
//!
//! # Examples
//!
//! ```
//! use nextpoint::{GaussianProcess, ObservationStore, Parameter, ParameterSpace};
//!
//! let space = ParameterSpace::new(vec![Parameter::new("x", 0.0, 10.0)]).unwrap();
//! let mut store = ObservationStore::new(space, true);
//! store.register_point(vec![2.0], 1.0).unwrap();
//! store.register_point(vec![8.0], 5.0).unwrap();
//!
//! let model = GaussianProcess::builder().alpha(1e-3).seed(1).build().fit(&store).unwrap();
//! let at_obs = model.predict(&[8.0]);
//! assert!((at_obs.mean - 5.0).abs() < 0.1);
//! assert!(at_obs.std_dev < model.predict(&[5.0]).std_dev);
//! ```

use core::fmt;

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::{Error, Result};
use crate::kernel::Matern52;
use crate::local::LocalSearch;
use crate::observation::ObservationStore;
use crate::rng_util;
use crate::space::ParameterSpace;

/// Default diagonal jitter / observation noise.
pub const DEFAULT_ALPHA: f64 = 1e-3;
/// Default number of random restarts of the hyperparameter search.
pub const DEFAULT_N_RESTARTS: usize = 5;

/// Length-scale bounds in unit-cube coordinates.
const LENGTH_SCALE_BOUNDS: (f64, f64) = (0.05, 100.0);
/// Signal-variance bounds in standardized target units.
const SIGNAL_VARIANCE_BOUNDS: (f64, f64) = (0.05, 20.0);
/// Starting length scale of the first hyperparameter run.
const INITIAL_LENGTH_SCALE: f64 = 0.5;
/// Jitter multiplier applied on the single factorization retry.
const JITTER_GROWTH: f64 = 100.0;
/// Lower limit of the escalated jitter, so `alpha = 0` still escalates.
const MIN_ESCALATED_JITTER: f64 = 1e-6;
/// `ln(2π)`.
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Posterior prediction at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    /// Posterior mean, in target units.
    pub mean: f64,
    /// Posterior standard deviation, in target units. Never negative.
    pub std_dev: f64,
}

/// Gaussian Process configuration.
///
/// # Examples
///
/// ```
/// use nextpoint::GaussianProcess;
///
/// let gp = GaussianProcess::builder()
///     .alpha(1e-4)
///     .n_restarts(10)
///     .seed(7)
///     .build();
/// assert_eq!(gp.n_restarts(), 10);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianProcess {
    alpha: f64,
    n_restarts: usize,
    seed: u64,
    search: LocalSearch,
}

impl Default for GaussianProcess {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GaussianProcess {
    /// Creates a builder for configuring a `GaussianProcess`.
    #[must_use]
    pub fn builder() -> GaussianProcessBuilder {
        GaussianProcessBuilder::default()
    }

    /// Diagonal jitter added to the covariance matrix.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of random restarts of the hyperparameter search.
    #[must_use]
    pub fn n_restarts(&self) -> usize {
        self.n_restarts
    }

    /// Fit the model to every observation in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptimizationFailed`] if the covariance matrix cannot
    /// be factorized even after the jitter retry.
    pub fn fit(&self, store: &ObservationStore) -> Result<SurrogateModel> {
        let space = store.space().clone();
        let x = store.normalized_points();
        let (y_mean, y_std, y_norm) = standardize(&store.targets());

        let fitted = with_jitter_retry(self.alpha.max(0.0), |jitter| {
            self.fit_standardized(&space, &x, &y_norm, jitter)
        })?;

        Ok(SurrogateModel {
            y_mean,
            y_std,
            ..fitted
        })
    }

    fn fit_standardized(
        &self,
        space: &ParameterSpace,
        x: &[Vec<f64>],
        y: &[f64],
        jitter: f64,
    ) -> Result<SurrogateModel> {
        let dim = space.dim();
        let default_kernel = Matern52::isotropic(dim, INITIAL_LENGTH_SCALE, 1.0);

        if x.is_empty() {
            return Ok(SurrogateModel {
                space: space.clone(),
                kernel: default_kernel,
                jitter,
                x_train: Vec::new(),
                factor: None,
                weights: DVector::zeros(0),
                y_mean: 0.0,
                y_std: 1.0,
                log_marginal_likelihood: None,
            });
        }

        let kernel = if x.len() < 2 {
            default_kernel
        } else {
            self.select_kernel(x, y, jitter, &default_kernel)?
        };

        let factor = kernel
            .matrix(x, jitter)
            .cholesky()
            .ok_or(Error::NumericalInstability { jitter })?;
        let y_vec = DVector::from_column_slice(y);
        let weights = factor.solve(&y_vec);
        let lml = log_marginal_likelihood(&factor, &y_vec, &weights);

        trace_debug!(
            length_scales = ?kernel.length_scales,
            signal_variance = kernel.signal_variance,
            log_marginal_likelihood = lml,
            "gp fitted"
        );

        Ok(SurrogateModel {
            space: space.clone(),
            kernel,
            jitter,
            x_train: x.to_vec(),
            factor: Some(factor),
            weights,
            y_mean: 0.0,
            y_std: 1.0,
            log_marginal_likelihood: Some(lml),
        })
    }

    /// Multi-start maximization of the log marginal likelihood.
    fn select_kernel(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        jitter: f64,
        default_kernel: &Matern52,
    ) -> Result<Matern52> {
        let dim = default_kernel.length_scales.len();
        let (lower, upper) = log_bounds(dim);
        let mut rng = fastrand::Rng::with_seed(self.seed);

        let mut starts = vec![default_kernel.log_params()];
        for _ in 0..self.n_restarts {
            starts.push(
                lower
                    .iter()
                    .zip(&upper)
                    .map(|(&lo, &hi)| rng_util::f64_range(&mut rng, lo, hi))
                    .collect(),
            );
        }

        let y_vec = DVector::from_column_slice(y);
        let mut best: Option<(f64, Vec<f64>)> = None;
        for start in &starts {
            let objective = |theta: &[f64]| {
                let (lml, grad) = lml_with_gradient(x, &y_vec, theta, jitter)?;
                Some((-lml, grad.into_iter().map(|g| -g).collect::<Vec<f64>>()))
            };
            let Ok(opt) = self.search.minimize(start, &lower, &upper, objective) else {
                continue;
            };
            let lml = -opt.value;
            if best.as_ref().is_none_or(|(b, _)| lml > *b) {
                best = Some((lml, opt.point));
            }
        }

        best.map(|(_, theta)| Matern52::from_log_params(&theta))
            .ok_or(Error::NumericalInstability { jitter })
    }
}

/// Builder for configuring a [`GaussianProcess`].
///
/// All options have sensible defaults:
/// - `alpha`: 1e-3
/// - `n_restarts`: 5
/// - `seed`: 1
/// - `max_iterations`: 100
#[derive(Debug, Clone, Default)]
pub struct GaussianProcessBuilder {
    alpha: Option<f64>,
    n_restarts: Option<usize>,
    seed: Option<u64>,
    max_iterations: Option<usize>,
}

impl GaussianProcessBuilder {
    /// Sets the jitter added to the covariance diagonal.
    ///
    /// Models observation noise and keeps the matrix positive definite.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Sets the number of random restarts of the hyperparameter search.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = Some(n);
        self
    }

    /// Sets the seed of the restart draws.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the iteration cap of each hyperparameter search run.
    #[must_use]
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Builds the configured [`GaussianProcess`].
    #[must_use]
    pub fn build(self) -> GaussianProcess {
        let search = self
            .max_iterations
            .map_or_else(LocalSearch::default, LocalSearch::with_max_iterations);
        GaussianProcess {
            alpha: self.alpha.unwrap_or(DEFAULT_ALPHA),
            n_restarts: self.n_restarts.unwrap_or(DEFAULT_N_RESTARTS),
            seed: self.seed.unwrap_or(1),
            search,
        }
    }
}

/// A fitted Gaussian Process.
pub struct SurrogateModel {
    space: ParameterSpace,
    kernel: Matern52,
    jitter: f64,
    /// Training inputs in unit-cube coordinates.
    x_train: Vec<Vec<f64>>,
    /// Cholesky factor of `K + jitter·I`; `None` for the prior.
    factor: Option<Cholesky<f64, Dyn>>,
    /// `(K + jitter·I)^{-1} y`, standardized targets.
    weights: DVector<f64>,
    y_mean: f64,
    y_std: f64,
    log_marginal_likelihood: Option<f64>,
}

impl fmt::Debug for SurrogateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurrogateModel")
            .field("kernel", &self.kernel)
            .field("jitter", &self.jitter)
            .field("n_train", &self.x_train.len())
            .field("y_mean", &self.y_mean)
            .field("y_std", &self.y_std)
            .field("log_marginal_likelihood", &self.log_marginal_likelihood)
            .finish_non_exhaustive()
    }
}

impl SurrogateModel {
    /// Predict at a point given in raw parameter units.
    #[must_use]
    pub fn predict(&self, point: &[f64]) -> Prediction {
        self.predict_unit(&self.space.normalize(point))
    }

    /// Predict at many raw points.
    #[must_use]
    pub fn predict_many(&self, points: &[Vec<f64>]) -> Vec<Prediction> {
        points.iter().map(|p| self.predict(p)).collect()
    }

    /// Predict at a point given in unit-cube coordinates.
    #[must_use]
    pub fn predict_unit(&self, unit: &[f64]) -> Prediction {
        let prior_var = self.kernel.signal_variance;
        let (mean, var) = match &self.factor {
            None => (0.0, prior_var),
            Some(factor) => {
                let k_star = self.kernel.cross(unit, &self.x_train);
                let mean = k_star.dot(&self.weights);
                let v = factor.solve(&k_star);
                (mean, (prior_var - k_star.dot(&v)).max(0.0))
            }
        };
        Prediction {
            mean: mean * self.y_std + self.y_mean,
            std_dev: var.sqrt() * self.y_std,
        }
    }

    /// The space the model was fitted over.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// The selected kernel hyperparameters.
    #[must_use]
    pub fn kernel(&self) -> &Matern52 {
        &self.kernel
    }

    /// The jitter actually used, after any escalation.
    #[must_use]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Number of training points.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }

    /// Log marginal likelihood of the standardized targets; `None` for the prior.
    #[must_use]
    pub fn log_marginal_likelihood(&self) -> Option<f64> {
        self.log_marginal_likelihood
    }

    /// Training-target mean and scale used for standardization.
    #[must_use]
    pub fn target_scaling(&self) -> (f64, f64) {
        (self.y_mean, self.y_std)
    }
}

/// Mean, scale and standardized copy of `y`.
///
/// Deviations are halved and rescaled by their largest magnitude before
/// squaring, so the scale stays finite for any finite targets. A zero scale
/// or fewer than two targets leave the scale at 1.
#[allow(clippy::cast_precision_loss)]
fn standardize(y: &[f64]) -> (f64, f64, Vec<f64>) {
    let n = y.len();
    if n == 0 {
        return (0.0, 1.0, Vec::new());
    }
    let nf = n as f64;
    let mean: f64 = y.iter().map(|v| v / nf).sum();
    let half_dev: Vec<f64> = y.iter().map(|v| v / 2.0 - mean / 2.0).collect();
    let peak = half_dev.iter().fold(0.0_f64, |m, d| m.max(d.abs()));

    let rel_std = if n < 2 || peak <= 0.0 {
        0.0
    } else {
        (half_dev.iter().map(|d| (d / peak).powi(2)).sum::<f64>() / nf).sqrt()
    };
    let std = (peak * rel_std) * 2.0;

    let y_norm = if std > f64::EPSILON {
        half_dev.iter().map(|d| d / peak / rel_std).collect()
    } else {
        half_dev.iter().map(|d| d * 2.0).collect()
    };
    let std = if std > f64::EPSILON { std } else { 1.0 };
    (mean, std, y_norm)
}

/// Runs `attempt` at `jitter`, retrying once with escalated jitter if the
/// covariance is not positive definite.
fn with_jitter_retry<T>(jitter: f64, mut attempt: impl FnMut(f64) -> Result<T>) -> Result<T> {
    match attempt(jitter) {
        Err(Error::NumericalInstability { jitter: failed }) => {
            let escalated = (failed * JITTER_GROWTH).max(MIN_ESCALATED_JITTER);
            trace_info!(
                jitter = failed,
                escalated,
                "covariance factorization failed, retrying with larger jitter"
            );
            attempt(escalated).map_err(|e| Error::optimization_failed(e.to_string()))
        }
        other => other,
    }
}

fn log_bounds(dim: usize) -> (Vec<f64>, Vec<f64>) {
    let mut lower = vec![LENGTH_SCALE_BOUNDS.0.ln(); dim];
    let mut upper = vec![LENGTH_SCALE_BOUNDS.1.ln(); dim];
    lower.push(SIGNAL_VARIANCE_BOUNDS.0.ln());
    upper.push(SIGNAL_VARIANCE_BOUNDS.1.ln());
    (lower, upper)
}

#[allow(clippy::cast_precision_loss)]
fn log_marginal_likelihood(
    factor: &Cholesky<f64, Dyn>,
    y: &DVector<f64>,
    weights: &DVector<f64>,
) -> f64 {
    let n = y.len() as f64;
    let half_log_det: f64 = factor.l_dirty().diagonal().iter().map(|v| v.ln()).sum();
    -0.5 * y.dot(weights) - half_log_det - 0.5 * n * LN_2PI
}

/// Log marginal likelihood and its gradient with respect to the packed log
/// hyperparameters.
///
/// `∂L/∂θ_p = ½ tr((w wᵀ − K⁻¹) ∂K/∂θ_p)` with `w = K⁻¹ y`.
fn lml_with_gradient(
    x: &[Vec<f64>],
    y: &DVector<f64>,
    theta: &[f64],
    jitter: f64,
) -> Option<(f64, Vec<f64>)> {
    let kernel = Matern52::from_log_params(theta);
    let factor = kernel.matrix(x, jitter).cholesky()?;
    let weights = factor.solve(y);
    let lml = log_marginal_likelihood(&factor, y, &weights);

    let inner: DMatrix<f64> = &weights * weights.transpose() - factor.inverse();
    let grad = kernel
        .matrix_gradients(x)
        .iter()
        .map(|dk| 0.5 * inner.component_mul(dk).sum())
        .collect();
    Some((lml, grad))
}
