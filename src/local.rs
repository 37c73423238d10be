//! Bound-constrained quasi-Newton local minimizer.
//!
//! A projected BFGS method: the search direction comes from the inverse
//! Hessian approximation restricted to the free coordinates, steps are
//! projected back onto the box, and an Armijo backtracking line search
//! along the projected path guarantees monotone decrease. Coordinates
//! pinned at a bound whose gradient points outward are frozen for the
//! iteration.
//!
//! Both the GP hyperparameter fit (minimizing the negative log marginal
//! likelihood) and the acquisition maximizer (minimizing the negated
//! acquisition) run on top of [`LocalSearch::minimize`].

use nalgebra::{DMatrix, DVector};

/// Sufficient-decrease constant for the Armijo condition.
const ARMIJO_C1: f64 = 1e-4;
/// Maximum number of step halvings per line search.
const MAX_BACKTRACKS: usize = 30;
/// Minimum curvature `sᵀy` for a BFGS update to be applied.
const MIN_CURVATURE: f64 = 1e-12;
/// Consecutive stalled iterations before the run is declared converged.
const MAX_STALLED: usize = 3;

/// Why a local search could not start.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocalSearchError {
    /// The objective could not be evaluated at the starting point.
    #[error("objective is not finite at the starting point")]
    NonFiniteStart,
    /// Bounds and starting point disagree in length.
    #[error("bounds have {bounds} dimensions but the start has {start}")]
    DimensionMismatch {
        /// Length of the bound vectors.
        bounds: usize,
        /// Length of the starting point.
        start: usize,
    },
}

/// Result of a local search.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalOptimum {
    /// Final point, inside the bounds.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Number of quasi-Newton iterations performed.
    pub iterations: usize,
    /// Whether a stopping tolerance was met before the iteration cap.
    pub converged: bool,
}

/// Configuration for the projected BFGS minimizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalSearch {
    /// Iteration cap per run.
    pub max_iterations: usize,
    /// Projected-gradient norm below which the run stops.
    pub gradient_tolerance: f64,
    /// Relative objective change below which the run stops.
    pub value_tolerance: f64,
}

impl Default for LocalSearch {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gradient_tolerance: 1e-6,
            value_tolerance: 1e-10,
        }
    }
}

impl LocalSearch {
    /// Creates a minimizer with the given iteration cap.
    #[must_use]
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    /// Minimize `objective` inside `[lower, upper]` starting from `start`.
    ///
    /// `objective` returns `(value, gradient)`, or `None` where it cannot be
    /// evaluated; such points are treated as rejected steps.
    ///
    /// # Errors
    ///
    /// Returns [`LocalSearchError`] if the dimensions disagree or the
    /// objective is not finite at the (projected) start.
    pub fn minimize<F>(
        &self,
        start: &[f64],
        lower: &[f64],
        upper: &[f64],
        mut objective: F,
    ) -> Result<LocalOptimum, LocalSearchError>
    where
        F: FnMut(&[f64]) -> Option<(f64, Vec<f64>)>,
    {
        let n = start.len();
        if lower.len() != n || upper.len() != n {
            return Err(LocalSearchError::DimensionMismatch {
                bounds: lower.len().min(upper.len()),
                start: n,
            });
        }

        let mut x = project(start, lower, upper);
        let Some((mut f, mut g)) = evaluate(&mut objective, &x) else {
            return Err(LocalSearchError::NonFiniteStart);
        };
        let mut h_inv = DMatrix::<f64>::identity(n, n);
        let mut stalled = 0;

        for k in 0..self.max_iterations {
            let free = free_mask(&x, &g, lower, upper);
            let pg_norm = g
                .iter()
                .zip(&free)
                .filter(|(_, free)| **free)
                .map(|(gi, _)| gi * gi)
                .sum::<f64>()
                .sqrt();
            if pg_norm < self.gradient_tolerance {
                return Ok(LocalOptimum {
                    point: x,
                    value: f,
                    iterations: k,
                    converged: true,
                });
            }

            let mut d = direction(&h_inv, &g, &free);
            if dot(&d, &g) >= 0.0 {
                h_inv = DMatrix::identity(n, n);
                d = direction(&h_inv, &g, &free);
            }

            let Some((x_new, f_new, g_new)) =
                line_search(&mut objective, &x, f, &g, &d, lower, upper)
            else {
                // No decrease along the projected path: x is a local optimum
                // to within line-search resolution.
                return Ok(LocalOptimum {
                    point: x,
                    value: f,
                    iterations: k,
                    converged: true,
                });
            };

            let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
            bfgs_update(&mut h_inv, &s, &y);

            let decrease = f - f_new;
            x = x_new;
            g = g_new;
            let scale = f.abs().max(f_new.abs()).max(1.0);
            f = f_new;
            stalled = if decrease <= self.value_tolerance * scale {
                stalled + 1
            } else {
                0
            };
            if stalled >= MAX_STALLED {
                return Ok(LocalOptimum {
                    point: x,
                    value: f,
                    iterations: k + 1,
                    converged: true,
                });
            }
        }

        Ok(LocalOptimum {
            point: x,
            value: f,
            iterations: self.max_iterations,
            converged: false,
        })
    }
}

/// Central finite-difference gradient, one-sided where a bound is hit.
///
/// Returns `None` if any probe is not finite.
pub fn numerical_gradient<F>(
    f: &mut F,
    x: &[f64],
    lower: &[f64],
    upper: &[f64],
    step: f64,
) -> Option<Vec<f64>>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut probe = x.to_vec();
    let mut grad = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        let hi = (x[i] + step).min(upper[i]);
        let lo = (x[i] - step).max(lower[i]);
        if hi <= lo {
            grad.push(0.0);
            continue;
        }
        probe[i] = hi;
        let f_hi = f(&probe);
        probe[i] = lo;
        let f_lo = f(&probe);
        probe[i] = x[i];
        let gi = (f_hi - f_lo) / (hi - lo);
        if !gi.is_finite() {
            return None;
        }
        grad.push(gi);
    }
    Some(grad)
}

fn evaluate<F>(objective: &mut F, x: &[f64]) -> Option<(f64, Vec<f64>)>
where
    F: FnMut(&[f64]) -> Option<(f64, Vec<f64>)>,
{
    let (f, g) = objective(x)?;
    (f.is_finite() && g.len() == x.len() && g.iter().all(|v| v.is_finite())).then_some((f, g))
}

fn project(x: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(lower.iter().zip(upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect()
}

/// Coordinates that may move: not pinned at a bound the descent direction pushes into.
fn free_mask(x: &[f64], g: &[f64], lower: &[f64], upper: &[f64]) -> Vec<bool> {
    (0..x.len())
        .map(|i| !((x[i] <= lower[i] && g[i] > 0.0) || (x[i] >= upper[i] && g[i] < 0.0)))
        .collect()
}

fn direction(h_inv: &DMatrix<f64>, g: &[f64], free: &[bool]) -> Vec<f64> {
    let g_free = DVector::from_fn(g.len(), |i, _| if free[i] { g[i] } else { 0.0 });
    let d = -(h_inv * g_free);
    d.iter()
        .zip(free)
        .map(|(&di, &is_free)| if is_free { di } else { 0.0 })
        .collect()
}

fn line_search<F>(
    objective: &mut F,
    x: &[f64],
    f: f64,
    g: &[f64],
    d: &[f64],
    lower: &[f64],
    upper: &[f64],
) -> Option<(Vec<f64>, f64, Vec<f64>)>
where
    F: FnMut(&[f64]) -> Option<(f64, Vec<f64>)>,
{
    let mut t = 1.0;
    for _ in 0..MAX_BACKTRACKS {
        let trial: Vec<f64> = x.iter().zip(d).map(|(xi, di)| xi + t * di).collect();
        let trial = project(&trial, lower, upper);
        let step: Vec<f64> = trial.iter().zip(x).map(|(a, b)| a - b).collect();
        let predicted = dot(g, &step);
        if step.iter().all(|s| s.abs() < f64::EPSILON) {
            return None;
        }
        if let Some((f_new, g_new)) = evaluate(objective, &trial)
            && f_new <= f + ARMIJO_C1 * predicted
            && f_new < f
        {
            return Some((trial, f_new, g_new));
        }
        t *= 0.5;
    }
    None
}

fn bfgs_update(h_inv: &mut DMatrix<f64>, s: &[f64], y: &[f64]) {
    let sy = dot(s, y);
    if sy <= MIN_CURVATURE {
        return;
    }
    let rho = 1.0 / sy;
    let s = DVector::from_column_slice(s);
    let y = DVector::from_column_slice(y);
    let hy = &*h_inv * &y;
    let yhy = y.dot(&hy);
    // H ← H − ρ(Hy sᵀ + s yᵀH) + (ρ² yᵀHy + ρ) s sᵀ
    *h_inv -= (&hy * s.transpose() + &s * hy.transpose()) * rho;
    *h_inv += (&s * s.transpose()) * (rho * rho * yhy + rho);
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
