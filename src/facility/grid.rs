//! Base grid load seen by the facility, before any V2G export.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::tariff::HOURS_PER_DAY;

/// Hourly base grid load with optional reproducible measurement noise.
///
/// The curve is the upstream demand the facility's net export is subtracted
/// from when reporting net load. Noise is Gaussian (Box-Muller over a seeded
/// `StdRng`) so identical seeds reproduce identical runs; a zero
/// `noise_std` makes the curve exact.
#[derive(Debug, Clone)]
pub struct GridBaseLoad {
    curve_kw: [f32; HOURS_PER_DAY],
    noise_std: f32,
    rng: StdRng,
}

impl GridBaseLoad {
    /// Creates a base load from a 24-point hourly curve.
    ///
    /// # Panics
    ///
    /// Panics if the curve is not exactly 24 non-negative entries or
    /// `noise_std` is negative.
    pub fn new(curve_kw: &[f32], noise_std: f32, seed: u64) -> Self {
        assert_eq!(
            curve_kw.len(),
            HOURS_PER_DAY,
            "base load curve requires exactly {HOURS_PER_DAY} hourly entries"
        );
        assert!(
            curve_kw.iter().all(|kw| kw.is_finite() && *kw >= 0.0),
            "base load must be finite and non-negative"
        );
        assert!(noise_std >= 0.0, "noise_std must be >= 0");

        let mut fixed = [0.0_f32; HOURS_PER_DAY];
        fixed.copy_from_slice(curve_kw);
        Self {
            curve_kw: fixed,
            noise_std,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the base load for an hour-of-day (wraps modulo 24).
    /// Never negative.
    pub fn load_kw(&mut self, hour: usize) -> f32 {
        let base = self.curve_kw[hour % HOURS_PER_DAY];

        let noise = if self.noise_std > 0.0 {
            // Gaussian-ish noise via Box-Muller
            let u1: f32 = self.rng.random::<f32>().clamp(1e-6, 1.0);
            let u2: f32 = self.rng.random::<f32>();
            let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
            z0 * self.noise_std
        } else {
            0.0
        };

        (base + noise).max(0.0)
    }
}
