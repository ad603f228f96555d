//! Noise calibration for per-attribute Gaussian mechanisms.

use serde::Serialize;

use netdpsyn_core::{DpError, Result};

/// Smallest per-attribute rho used when deriving sigma.
///
/// A zero allocation therefore yields a very large but finite sigma.
pub const RHO_FLOOR: f64 = 1e-12;

/// Noise scale derived from a stage's rho allocation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SigmaAllocation {
    rho: f64,
    attribute_count: usize,
    rho_per_attribute: f64,
    sigma: f64,
}

impl SigmaAllocation {
    /// Split `rho` evenly over `attribute_count` Gaussian mechanisms and derive
    /// the noise standard deviation each must use.
    pub fn calibrate(rho: f64, attribute_count: i64, sensitivity: f64) -> Result<Self> {
        if attribute_count < 0 {
            return Err(DpError::InvalidAttributeCount {
                count: attribute_count,
            });
        }
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(DpError::InvalidSensitivity { value: sensitivity });
        }
        if !rho.is_finite() || rho < 0.0 {
            return Err(DpError::InvalidBudget { value: rho });
        }

        let attribute_count = attribute_count as usize;
        let rho_per_attribute = rho / attribute_count.max(1) as f64;
        // sensitivity / sqrt(2 rho) rather than sqrt(sensitivity² / 2 rho) to avoid
        // overflowing the square for large sensitivities.
        let sigma = sensitivity / (2.0 * rho_per_attribute.max(RHO_FLOOR)).sqrt();
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(DpError::numerical(format!(
                "sigma {sigma} for rho_per_attribute={rho_per_attribute}, sensitivity={sensitivity}"
            )));
        }

        Ok(Self {
            rho,
            attribute_count,
            rho_per_attribute,
            sigma,
        })
    }

    /// Rho the allocation was derived from.
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Number of attributes sharing the rho.
    pub fn attribute_count(&self) -> usize {
        self.attribute_count
    }

    /// Rho spent on each attribute.
    pub fn rho_per_attribute(&self) -> f64 {
        self.rho_per_attribute
    }

    /// Gaussian noise standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

/// Noise standard deviation for `attribute_count` Gaussian mechanisms sharing `rho`.
pub fn sigma_for_rho(rho: f64, attribute_count: i64, sensitivity: f64) -> Result<f64> {
    SigmaAllocation::calibrate(rho, attribute_count, sensitivity).map(|a| a.sigma())
}
