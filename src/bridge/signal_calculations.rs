//! Link metric calculations over cached path lists.
//!
//! Contains helpers for:
//! - Coherent (complex) summation of path coefficients
//! - Path loss in dB from the coherent channel gain
//! - Minimum propagation delay over a set of paths
//!
//! Units:
//! - Path loss: dB (positive means attenuation)
//! - Delay: seconds

use num_complex::Complex64;

/// Path loss reported when the coherent gain is zero (no usable paths).
pub const UNREACHABLE_PATH_LOSS_DB: f64 = 300.0;

/// Delay reported when no non-negative delay exists for a pair.
pub const NO_DELAY_SECONDS: f64 = 1e5;

/// Sum path coefficients as complex numbers.
///
/// Paths add as phasors before power is taken, so paths arriving out of phase
/// cancel. This is what distinguishes a coherent sum from a power sum.
pub fn coherent_sum(coefficients: &[Complex64]) -> Complex64 {
    coefficients.iter().sum()
}

/// Calculate the path loss (in dB) of a set of paths.
///
/// # Formula
///
/// ```text
/// PL = -10 × log₁₀(|Σ aᵢ|²)
/// ```
///
/// # Returns
///
/// Path loss in dB, or [`UNREACHABLE_PATH_LOSS_DB`] when `|Σ aᵢ|²` is zero
/// (including the empty set).
pub fn path_loss_db(coefficients: &[Complex64]) -> f64 {
    let gain = coherent_sum(coefficients).norm_sqr();
    if gain > 0.0 { -10.0 * gain.log10() } else { UNREACHABLE_PATH_LOSS_DB }
}

/// Smallest absolute delay among the paths, or [`NO_DELAY_SECONDS`].
///
/// NaN delays never qualify.
pub fn min_delay(delays: &[f64]) -> f64 {
    delays.iter().map(|d| d.abs()).filter(|d| *d >= 0.0).reduce(f64::min).unwrap_or(NO_DELAY_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coherent_sum_cancels_opposite_phases() {
        let sum = coherent_sum(&[Complex64::new(0.5, 0.0), Complex64::new(-0.5, 0.0)]);
        assert_eq!(sum, Complex64::new(0.0, 0.0));

        let sum = coherent_sum(&[Complex64::new(0.01, 0.02), Complex64::new(0.03, -0.01)]);
        assert!((sum.re - 0.04).abs() < 1e-15);
        assert!((sum.im - 0.01).abs() < 1e-15);
    }

    #[test]
    fn path_loss_of_two_in_phase_paths() {
        let loss = path_loss_db(&[Complex64::new(0.01, 0.0), Complex64::new(0.02, 0.0)]);
        let expected = -10.0 * (0.03_f64 * 0.03).log10();
        assert!((loss - expected).abs() < 1e-9);
        assert!((loss - 30.4575749).abs() < 1e-6);
    }

    #[test]
    fn path_loss_is_exactly_300_without_gain() {
        assert_eq!(path_loss_db(&[]), 300.0);
        assert_eq!(path_loss_db(&[Complex64::new(0.2, 0.1), Complex64::new(-0.2, -0.1)]), 300.0);
    }

    #[test]
    fn min_delay_uses_absolute_values() {
        assert_eq!(min_delay(&[2e-7, 1e-7]), 1e-7);
        assert_eq!(min_delay(&[3e-7, -5e-8]), 5e-8);
    }

    #[test]
    fn min_delay_sentinel_without_qualifying_values() {
        assert_eq!(min_delay(&[]), 1e5);
        assert_eq!(min_delay(&[f64::NAN]), 1e5);
    }
}
