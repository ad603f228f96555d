//! Exact privacy curve of the Gaussian mechanism.

use statrs::distribution::{ContinuousCDF, Normal};

use netdpsyn_core::{DpError, Result};

use crate::calibrate::{smallest_within, SearchTolerance};

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| DpError::numerical(format!("standard normal: {e}")))
}

/// Smallest delta at which a unit-sensitivity Gaussian with noise `sigma` is
/// (eps, delta)-DP.
fn gaussian_delta(sigma: f64, eps: f64, normal: &Normal) -> f64 {
    if !sigma.is_finite() || sigma <= 0.0 || !eps.is_finite() {
        return 1.0;
    }
    let term1 = normal.cdf(-eps * sigma + 1.0 / (2.0 * sigma));
    let term2 = eps.exp() * normal.cdf(-eps * sigma - 1.0 / (2.0 * sigma));
    (term1 - term2).clamp(0.0, 1.0)
}

/// Smallest noise multiplier making a unit-sensitivity Gaussian (eps, delta)-DP.
pub fn sigma_for_gaussian_eps_delta(eps: f64, delta: f64) -> Result<f64> {
    if !eps.is_finite() || eps <= 0.0 {
        return Err(DpError::invalid_param("epsilon", eps, "must be finite and > 0"));
    }
    if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
        return Err(DpError::invalid_param("delta", delta, "must be in (0, 1)"));
    }
    let normal = standard_normal()?;
    smallest_within(
        |sigma| gaussian_delta(sigma, eps, &normal),
        delta,
        1e-6,
        1.0,
        SearchTolerance::default(),
    )
}

/// Smallest epsilon at which a unit-sensitivity Gaussian with noise `sigma`
/// is (eps, delta)-DP.
pub fn epsilon_for_gaussian_sigma(sigma: f64, delta: f64) -> Result<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(DpError::numerical("sigma must be finite and > 0"));
    }
    if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
        return Err(DpError::invalid_param("delta", delta, "must be in (0, 1)"));
    }
    let normal = standard_normal()?;
    if gaussian_delta(sigma, 0.0, &normal) <= delta {
        return Ok(0.0);
    }
    smallest_within(
        |eps| gaussian_delta(sigma, eps, &normal),
        delta,
        1e-9,
        1.0,
        SearchTolerance::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_for_gaussian_is_positive() {
        let sigma = sigma_for_gaussian_eps_delta(1.0, 1e-6).expect("sigma");
        assert!(sigma.is_finite());
        assert!(sigma > 0.0);
    }

    #[test]
    fn more_epsilon_needs_less_noise() {
        let loose = sigma_for_gaussian_eps_delta(4.0, 1e-6).expect("sigma");
        let tight = sigma_for_gaussian_eps_delta(0.5, 1e-6).expect("sigma");
        assert!(tight > loose);
    }

    #[test]
    fn epsilon_inverts_sigma() {
        let sigma = sigma_for_gaussian_eps_delta(2.0, 1e-8).expect("sigma");
        let eps = epsilon_for_gaussian_sigma(sigma, 1e-8).expect("epsilon");
        assert!((eps - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_delta() {
        assert!(sigma_for_gaussian_eps_delta(1.0, 0.0).is_err());
        assert!(sigma_for_gaussian_eps_delta(1.0, 1.0).is_err());
    }
}
