/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Generate a point uniformly distributed in the unit hypercube `[0, 1)^d`.
pub(crate) fn unit_point(rng: &mut fastrand::Rng, d: usize) -> Vec<f64> {
    (0..d).map(|_| rng.f64()).collect()
}

/// Derive an independent `u32` seed from the request seed.
///
/// Used where a second generator (e.g. Sobol scrambling) must stay
/// reproducible without sharing state with the primary RNG.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn derive_seed(seed: u64, stream: u64) -> u32 {
    let mut rng = fastrand::Rng::with_seed(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    rng.u64(..) as u32
}
