//! Acquisition functions: scalar utilities over the posterior.
//!
//! An acquisition function turns a posterior [`Prediction`] into a utility
//! to be maximized, trading off exploitation (high mean) against
//! exploration (high standard deviation). [`UpperConfidenceBound`] is the
//! default; [`ExpectedImprovement`] and [`ProbabilityOfImprovement`]
//! measure improvement over the best observed target.
//!
//! Scoring never mutates the surrogate, so a [`FittedAcquisition`] can be
//! queried at any number of points.

use serde::{Deserialize, Serialize};

use crate::gp::{Prediction, SurrogateModel};

/// Default exploration weight of [`UpperConfidenceBound`].
pub const DEFAULT_KAPPA: f64 = 2.5;

/// Standard deviations below this are treated as zero.
const MIN_STD: f64 = 1e-12;

/// Scalar utility over a posterior prediction.
pub trait AcquisitionFunction: Send + Sync {
    /// Utility of a point with posterior `prediction`.
    ///
    /// `incumbent` is the best observed target, or `None` when nothing has
    /// been observed.
    fn utility(&self, prediction: Prediction, incumbent: Option<f64>) -> f64;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// `mean + kappa · std_dev`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpperConfidenceBound {
    /// Exploration weight; `0` is pure exploitation.
    pub kappa: f64,
}

impl Default for UpperConfidenceBound {
    fn default() -> Self {
        Self {
            kappa: DEFAULT_KAPPA,
        }
    }
}

impl AcquisitionFunction for UpperConfidenceBound {
    fn utility(&self, prediction: Prediction, _incumbent: Option<f64>) -> f64 {
        prediction.mean + self.kappa * prediction.std_dev
    }

    fn name(&self) -> &'static str {
        "ucb"
    }
}

/// Expected Improvement over the incumbent.
///
/// `EI(x) = (mean - best - xi) Φ(z) + std φ(z)`
/// where `z = (mean - best - xi) / std`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExpectedImprovement {
    /// Minimum improvement of interest.
    pub xi: f64,
}

impl AcquisitionFunction for ExpectedImprovement {
    fn utility(&self, prediction: Prediction, incumbent: Option<f64>) -> f64 {
        let best = incumbent.unwrap_or(prediction.mean);
        let gain = prediction.mean - best - self.xi;
        if prediction.std_dev < MIN_STD {
            return gain.max(0.0);
        }
        let z = gain / prediction.std_dev;
        (gain * norm_cdf(z) + prediction.std_dev * norm_pdf(z)).max(0.0)
    }

    fn name(&self) -> &'static str {
        "ei"
    }
}

/// Probability that a point improves on the incumbent by at least `xi`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbabilityOfImprovement {
    /// Minimum improvement of interest.
    pub xi: f64,
}

impl AcquisitionFunction for ProbabilityOfImprovement {
    fn utility(&self, prediction: Prediction, incumbent: Option<f64>) -> f64 {
        let best = incumbent.unwrap_or(prediction.mean);
        let gain = prediction.mean - best - self.xi;
        if prediction.std_dev < MIN_STD {
            return if gain > 0.0 { 1.0 } else { 0.0 };
        }
        norm_cdf(gain / prediction.std_dev)
    }

    fn name(&self) -> &'static str {
        "pi"
    }
}

/// Configurable choice of acquisition function.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcquisitionKind {
    /// See [`UpperConfidenceBound`].
    UpperConfidenceBound {
        /// Exploration weight.
        kappa: f64,
    },
    /// See [`ExpectedImprovement`].
    ExpectedImprovement {
        /// Minimum improvement of interest.
        #[serde(default)]
        xi: f64,
    },
    /// See [`ProbabilityOfImprovement`].
    ProbabilityOfImprovement {
        /// Minimum improvement of interest.
        #[serde(default)]
        xi: f64,
    },
}

impl Default for AcquisitionKind {
    fn default() -> Self {
        Self::UpperConfidenceBound {
            kappa: DEFAULT_KAPPA,
        }
    }
}

impl AcquisitionFunction for AcquisitionKind {
    fn utility(&self, prediction: Prediction, incumbent: Option<f64>) -> f64 {
        match *self {
            Self::UpperConfidenceBound { kappa } => {
                UpperConfidenceBound { kappa }.utility(prediction, incumbent)
            }
            Self::ExpectedImprovement { xi } => {
                ExpectedImprovement { xi }.utility(prediction, incumbent)
            }
            Self::ProbabilityOfImprovement { xi } => {
                ProbabilityOfImprovement { xi }.utility(prediction, incumbent)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::UpperConfidenceBound { .. } => "ucb",
            Self::ExpectedImprovement { .. } => "ei",
            Self::ProbabilityOfImprovement { .. } => "pi",
        }
    }
}

/// An acquisition function bound to a fitted surrogate.
pub struct FittedAcquisition<'a> {
    model: &'a SurrogateModel,
    acquisition: &'a dyn AcquisitionFunction,
    incumbent: Option<f64>,
}

impl<'a> FittedAcquisition<'a> {
    /// Binds `acquisition` to `model`, with the best observed target as incumbent.
    pub fn new(
        model: &'a SurrogateModel,
        acquisition: &'a dyn AcquisitionFunction,
        incumbent: Option<f64>,
    ) -> Self {
        Self {
            model,
            acquisition,
            incumbent,
        }
    }

    /// Utility at a raw-unit point.
    #[must_use]
    pub fn value(&self, point: &[f64]) -> f64 {
        self.acquisition
            .utility(self.model.predict(point), self.incumbent)
    }

    /// Utility at a unit-cube point.
    #[must_use]
    pub fn value_unit(&self, unit: &[f64]) -> f64 {
        self.acquisition
            .utility(self.model.predict_unit(unit), self.incumbent)
    }

    /// The underlying surrogate.
    #[must_use]
    pub fn model(&self) -> &SurrogateModel {
        self.model
    }

    /// Name of the wrapped acquisition function.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.acquisition.name()
    }
}

/// Standard normal PDF.
fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz-Stegun rational approximation).
fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782 + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}
