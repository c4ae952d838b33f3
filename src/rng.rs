//! Injected random number sources.
//!
//! Every stage that needs randomness (NMF initialization, bootstrap
//! resampling, synthetic tables) takes a [`RandomSource`] argument instead of
//! owning a generator. Any `FnMut() -> f64` closure returning values in
//! `[0, 1)` is a valid source, so callers control seeding completely.

use serde::{Deserialize, Serialize};

/// A source of uniform floats in `[0, 1)`.
pub trait RandomSource {
    /// Draw the next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

impl<F> RandomSource for F
where
    F: FnMut() -> f64,
{
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

/// Simple deterministic RNG (xorshift64).
///
/// Sufficient for reproducible test fixtures and bootstrap runs; not
/// suitable for anything security related.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    /// Create a generator from a seed. A zero seed is remapped, since
    /// xorshift has an all-zero fixed point.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl RandomSource for Xorshift64 {
    fn next_f64(&mut self) -> f64 {
        // Top 53 bits give a uniform double strictly below 1.0.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Next draw forced into `[0, 1]`; non-finite draws map to 0.
pub fn uniform<R: RandomSource + ?Sized>(rng: &mut R) -> f64 {
    let u = rng.next_f64();
    if u.is_finite() {
        u.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Draw an index uniformly from `0..n`. Returns 0 when `n == 0`.
pub fn sample_index<R: RandomSource + ?Sized>(rng: &mut R, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    ((uniform(rng) * n as f64) as usize).min(n - 1)
}

/// Draw `n` indices from `0..n` with replacement (one bootstrap resample).
pub fn bootstrap_indices<R: RandomSource + ?Sized>(rng: &mut R, n: usize) -> Vec<usize> {
    (0..n).map(|_| sample_index(rng, n)).collect()
}

/// Approximately normal draw via Box-Muller.
pub fn next_normal<R: RandomSource + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let u1 = uniform(rng).max(1e-12);
    let u2 = uniform(rng);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z
}
