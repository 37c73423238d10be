//! Posterior curves for one-dimensional spaces.
//!
//! A read-only view of a fitted [`SurrogateModel`]: the posterior mean and
//! standard deviation sampled on an evenly spaced grid spanning the single
//! parameter's bounds, plus the registered observations for overlay.

use serde::Serialize;

use crate::gp::SurrogateModel;
use crate::observation::ObservationStore;

/// Default number of grid points.
pub const DEFAULT_GRID_RESOLUTION: usize = 1000;

/// Posterior mean/uncertainty over a 1-D grid.
///
/// `x`, `predicted_mean` and `predicted_sigma` share one length; the
/// observed arrays have one entry per registered observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticCurve {
    /// Grid locations, increasing from `lower` to `upper` inclusive.
    pub x: Vec<f64>,
    /// Posterior mean at each grid location.
    #[serde(rename = "y_pred")]
    pub predicted_mean: Vec<f64>,
    /// Posterior standard deviation at each grid location.
    #[serde(rename = "sigma")]
    pub predicted_sigma: Vec<f64>,
    /// Registered observation locations.
    pub observed_x: Vec<f64>,
    /// Registered observation targets.
    pub observed_y: Vec<f64>,
}

impl DiagnosticCurve {
    /// Number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the grid is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Sample `model` on `resolution` evenly spaced points.
///
/// Returns `None` unless the space has exactly one parameter.
#[must_use]
pub fn emit(
    model: &SurrogateModel,
    store: &ObservationStore,
    resolution: usize,
) -> Option<DiagnosticCurve> {
    let space = model.space();
    let [param] = space.parameters() else {
        return None;
    };

    let x = linspace(param.lower, param.upper, resolution);
    let (predicted_mean, predicted_sigma) = x
        .iter()
        .map(|&v| {
            let p = model.predict(&[v]);
            (p.mean, p.std_dev)
        })
        .unzip();

    let (observed_x, observed_y) = store
        .observations()
        .iter()
        .map(|o| (o.point[0], o.target))
        .unzip();

    Some(DiagnosticCurve {
        x,
        predicted_mean,
        predicted_sigma,
        observed_x,
        observed_y,
    })
}

/// `n` evenly spaced values from `lower` to `upper`, both included exactly.
#[allow(clippy::cast_precision_loss)]
fn linspace(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lower],
        _ => {
            let step = (upper - lower) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        upper
                    } else {
                        (lower + step * i as f64).min(upper)
                    }
                })
                .collect()
        }
    }
}
