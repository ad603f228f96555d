//! Privacy parameters and stage ratios for a synthesis run.

use serde::{Deserialize, Serialize};

use netdpsyn_core::{DpError, Result};

/// Absolute tolerance within which stage ratios count as summing to one.
pub const RATIO_SUM_TOLERANCE: f64 = 1e-9;

/// Target (epsilon, delta) guarantee and the L2 sensitivity of one marginal addition.
///
/// Immutable once constructed; every field is validated by [`PrivacyParameters::new`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PrivacyParameters {
    epsilon: f64,
    delta: f64,
    sensitivity: f64,
}

impl PrivacyParameters {
    /// Create validated privacy parameters.
    pub fn new(epsilon: f64, delta: f64, sensitivity: f64) -> Result<Self> {
        let params = Self {
            epsilon,
            delta,
            sensitivity,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create parameters with `delta = 1/n²` for a dataset of `num_records` rows.
    pub fn for_records(epsilon: f64, num_records: usize, sensitivity: f64) -> Result<Self> {
        Self::new(epsilon, delta_for_records(num_records)?, sensitivity)
    }

    /// Target epsilon.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Target delta.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// L2 sensitivity of a single marginal addition.
    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(DpError::invalid_param(
                "epsilon",
                self.epsilon,
                "must be finite and > 0",
            ));
        }
        if !self.delta.is_finite() || self.delta <= 0.0 || self.delta >= 1.0 {
            return Err(DpError::invalid_param(
                "delta",
                self.delta,
                "must be in (0, 1)",
            ));
        }
        if !self.sensitivity.is_finite() || self.sensitivity <= 0.0 {
            return Err(DpError::invalid_param(
                "sensitivity",
                self.sensitivity,
                "must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// The conventional delta for `n` records: `1 / n²`.
pub fn delta_for_records(num_records: usize) -> Result<f64> {
    if num_records == 0 {
        return Err(DpError::invalid_param(
            "num_records",
            0.0,
            "must be >= 1 to derive delta",
        ));
    }
    let n = num_records as f64;
    Ok(1.0 / (n * n))
}

/// Share of the total rho given to each pipeline stage.
///
/// Ratios need not sum to one; the allocator rescales them (and records that it
/// did) before use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageRatios {
    /// Share spent on binning/recoding.
    pub binning: f64,
    /// Share spent on marginal selection.
    pub selection: f64,
    /// Share spent on publishing noisy marginals.
    pub publish: f64,
}

impl Default for StageRatios {
    fn default() -> Self {
        Self {
            binning: 0.1,
            selection: 0.1,
            publish: 0.8,
        }
    }
}

impl StageRatios {
    /// Create a ratio triple (binning, selection, publish).
    pub fn new(binning: f64, selection: f64, publish: f64) -> Self {
        Self {
            binning,
            selection,
            publish,
        }
    }

    /// Sum of the three ratios.
    pub fn sum(&self) -> f64 {
        self.binning + self.selection + self.publish
    }

    /// Whether the ratios already sum to one within [`RATIO_SUM_TOLERANCE`].
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= RATIO_SUM_TOLERANCE
    }

    /// Reject negative or non-finite ratios and ratio sets that sum to zero.
    pub fn validate(&self) -> Result<()> {
        for (stage, value) in [
            ("binning", self.binning),
            ("selection", self.selection),
            ("publish", self.publish),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DpError::InvalidRatio { stage, value });
            }
        }
        let sum = self.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(DpError::InvalidRatio {
                stage: "sum",
                value: sum,
            });
        }
        Ok(())
    }

    /// Divide every ratio by the sum.
    pub(crate) fn rescaled(&self) -> Self {
        let sum = self.sum();
        Self {
            binning: self.binning / sum,
            selection: self.selection / sum,
            publish: self.publish / sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdpsyn_core::DpErrorKind;

    #[test]
    fn valid_params() {
        let p = PrivacyParameters::new(2.0, 1e-10, 1.0).expect("valid params");
        assert_eq!(p.epsilon(), 2.0);
        assert_eq!(p.delta(), 1e-10);
        assert_eq!(p.sensitivity(), 1.0);
    }

    #[test]
    fn rejects_boundary_values() {
        for (eps, delta, sens, name) in [
            (0.0, 1e-6, 1.0, "epsilon"),
            (-1.0, 1e-6, 1.0, "epsilon"),
            (f64::NAN, 1e-6, 1.0, "epsilon"),
            (1.0, 0.0, 1.0, "delta"),
            (1.0, 1.0, 1.0, "delta"),
            (1.0, 1e-6, 0.0, "sensitivity"),
            (1.0, 1e-6, f64::INFINITY, "sensitivity"),
        ] {
            let err = PrivacyParameters::new(eps, delta, sens).expect_err("must reject");
            assert_eq!(err.kind(), DpErrorKind::InvalidPrivacyParameter);
            match err {
                DpError::InvalidPrivacyParameter { param, .. } => assert_eq!(param, name),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn delta_from_record_count() {
        let delta = delta_for_records(1_000).expect("delta");
        assert!((delta - 1e-6).abs() < 1e-18);
        assert!(delta_for_records(0).is_err());
        // One record gives delta = 1, which the parameters refuse.
        assert!(PrivacyParameters::for_records(1.0, 1, 1.0).is_err());
    }

    #[test]
    fn ratio_validation() {
        assert!(StageRatios::default().validate().is_ok());
        assert!(StageRatios::default().is_normalized());

        let err = StageRatios::new(0.1, -0.1, 0.8).validate().expect_err("negative");
        assert!(matches!(
            err,
            DpError::InvalidRatio {
                stage: "selection",
                ..
            }
        ));

        let err = StageRatios::new(0.0, 0.0, 0.0).validate().expect_err("zero sum");
        assert!(matches!(err, DpError::InvalidRatio { stage: "sum", .. }));
    }
}
