//! Matérn 5/2 covariance kernel with ARD length scales.
//!
//! `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
//! where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`.
//!
//! Hyperparameters are optimized in log space; the packed vector layout is
//! `[ln l_1, …, ln l_d, ln σ²]`.

use nalgebra::{DMatrix, DVector};

/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matérn 5/2 kernel with one length scale per dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Matern52 {
    /// Length scale per dimension, in unit-cube coordinates.
    pub length_scales: Vec<f64>,
    /// Signal variance `σ²`, the prior variance at every point.
    pub signal_variance: f64,
}

impl Matern52 {
    /// Isotropic kernel with the given length scale and signal variance.
    #[must_use]
    pub fn isotropic(dim: usize, length_scale: f64, signal_variance: f64) -> Self {
        Self {
            length_scales: vec![length_scale; dim],
            signal_variance,
        }
    }

    /// Rebuild a kernel from packed log hyperparameters.
    #[must_use]
    pub fn from_log_params(theta: &[f64]) -> Self {
        let (ls, sv) = theta.split_at(theta.len() - 1);
        Self {
            length_scales: ls.iter().map(|v| v.exp()).collect(),
            signal_variance: sv[0].exp(),
        }
    }

    /// Packed log hyperparameters.
    #[must_use]
    pub fn log_params(&self) -> Vec<f64> {
        self.length_scales
            .iter()
            .map(|l| l.ln())
            .chain(core::iter::once(self.signal_variance.ln()))
            .collect()
    }

    /// Number of packed hyperparameters.
    #[must_use]
    pub fn n_params(&self) -> usize {
        self.length_scales.len() + 1
    }

    fn scaled_sq_dist(&self, x1: &[f64], x2: &[f64]) -> f64 {
        x1.iter()
            .zip(x2)
            .zip(&self.length_scales)
            .map(|((a, b), l)| {
                let d = (a - b) / l;
                d * d
            })
            .sum()
    }

    /// Covariance between two points.
    #[must_use]
    pub fn eval(&self, x1: &[f64], x2: &[f64]) -> f64 {
        let r_sq = self.scaled_sq_dist(x1, x2);
        let sqrt5_r = SQRT_5 * r_sq.sqrt();
        self.signal_variance * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
    }

    /// Build the kernel matrix `K + jitter·I`.
    #[must_use]
    pub fn matrix(&self, x: &[Vec<f64>], jitter: f64) -> DMatrix<f64> {
        let n = x.len();
        let mut k = DMatrix::zeros(n, n);
        for i in 0..n {
            k[(i, i)] = self.signal_variance + jitter;
            for j in 0..i {
                let v = self.eval(&x[i], &x[j]);
                k[(i, j)] = v;
                k[(j, i)] = v;
            }
        }
        k
    }

    /// Compute the kernel vector `k(x*, X)` for a query point.
    #[must_use]
    pub fn cross(&self, x_star: &[f64], x_train: &[Vec<f64>]) -> DVector<f64> {
        DVector::from_fn(x_train.len(), |i, _| self.eval(x_star, &x_train[i]))
    }

    /// Derivatives of the (jitter-free) kernel matrix with respect to each
    /// packed log hyperparameter.
    ///
    /// `∂k/∂ln l_m = σ² (5/3)(1 + √5 r) exp(-√5 r) · d_m² / l_m²`
    /// and `∂k/∂ln σ² = k`.
    #[must_use]
    pub fn matrix_gradients(&self, x: &[Vec<f64>]) -> Vec<DMatrix<f64>> {
        let n = x.len();
        let d = self.length_scales.len();
        let mut grads = vec![DMatrix::zeros(n, n); d + 1];
        for i in 0..n {
            grads[d][(i, i)] = self.signal_variance;
            for j in 0..i {
                let r_sq = self.scaled_sq_dist(&x[i], &x[j]);
                let sqrt5_r = SQRT_5 * r_sq.sqrt();
                let e = (-sqrt5_r).exp();
                let common = self.signal_variance * 5.0 / 3.0 * (1.0 + sqrt5_r) * e;
                for (m, grad) in grads.iter_mut().take(d).enumerate() {
                    let dm = (x[i][m] - x[j][m]) / self.length_scales[m];
                    let v = common * dm * dm;
                    grad[(i, j)] = v;
                    grad[(j, i)] = v;
                }
                let k = self.signal_variance * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * e;
                grads[d][(i, j)] = k;
                grads[d][(j, i)] = k;
            }
        }
        grads
    }
}
