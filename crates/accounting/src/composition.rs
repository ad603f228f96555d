//! Composition accountant: from an (epsilon, delta) target to a per-mechanism
//! Gaussian noise multiplier and its zCDP cost.
//!
//! Under zCDP the costs of sequential mechanisms add, so a target that admits a
//! total cost `rho*` spread over `k` identical Gaussian mechanisms gives each
//! one `rho* / k`. A Gaussian with noise `sigma` on an L2 sensitivity `s`
//! costs `s² / (2 sigma²)`.

use netdpsyn_core::{DpError, Result};

use crate::{PrivacyParameters, ZcdpConversion};

/// Converts (epsilon, delta, sensitivity) targets into Gaussian noise and zCDP cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositionAccountant {
    conversion: ZcdpConversion,
}

impl CompositionAccountant {
    /// Create an accountant using the given zCDP conversion.
    pub fn new(conversion: ZcdpConversion) -> Self {
        Self { conversion }
    }

    /// The conversion this accountant applies.
    pub fn conversion(&self) -> ZcdpConversion {
        self.conversion
    }

    /// Noise standard deviation each of `num_compositions` Gaussian mechanisms
    /// must use so that their composition is (epsilon, delta)-DP.
    pub fn gaussian_sigma(&self, params: &PrivacyParameters, num_compositions: u64) -> Result<f64> {
        if num_compositions == 0 {
            return Err(DpError::invalid_param(
                "num_compositions",
                0.0,
                "must be >= 1",
            ));
        }
        let total = self
            .conversion
            .rho_for_epsilon(params.epsilon(), params.delta())?;
        let k = num_compositions as f64;
        let sigma = params.sensitivity() * (k / (2.0 * total)).sqrt();
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(DpError::numerical(format!(
                "gaussian sigma {sigma} from rho={total}"
            )));
        }
        Ok(sigma)
    }

    /// zCDP cost of one of the `num_compositions` calibrated Gaussian mechanisms.
    pub fn total_rho(&self, params: &PrivacyParameters, num_compositions: u64) -> Result<f64> {
        let sigma = self.gaussian_sigma(params, num_compositions)?;
        let sensitivity = params.sensitivity();
        Ok(sensitivity * sensitivity / (2.0 * sigma * sigma))
    }
}

/// Gaussian noise multiplier for (epsilon, delta)-DP over `num_compositions`
/// mechanisms, using the closed-form zCDP conversion.
pub fn gauss_zcdp_sigma(
    epsilon: f64,
    delta: f64,
    sensitivity: f64,
    num_compositions: u64,
) -> Result<f64> {
    let params = PrivacyParameters::new(epsilon, delta, sensitivity)?;
    CompositionAccountant::default().gaussian_sigma(&params, num_compositions)
}

/// Total zCDP budget for an (epsilon, delta)-DP target, using the closed-form
/// zCDP conversion.
pub fn total_rho(epsilon: f64, delta: f64, sensitivity: f64, num_compositions: u64) -> Result<f64> {
    let params = PrivacyParameters::new(epsilon, delta, sensitivity)?;
    CompositionAccountant::default().total_rho(&params, num_compositions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdpsyn_core::DpErrorKind;
    use proptest::prelude::*;

    #[test]
    fn single_mechanism_rho_matches_conversion() {
        let rho = total_rho(2.0, 1e-10, 1.0, 1).expect("rho");
        let direct = ZcdpConversion::BunSteinke
            .rho_for_epsilon(2.0, 1e-10)
            .expect("rho");
        assert!(rho > 0.0);
        assert!((rho - direct).abs() <= 1e-12 * direct);
    }

    #[test]
    fn sensitivity_cancels_in_rho() {
        let unit = total_rho(1.0, 1e-8, 1.0, 1).expect("rho");
        let scaled = total_rho(1.0, 1e-8, 7.5, 1).expect("rho");
        assert!((unit - scaled).abs() <= 1e-12 * unit);

        let sigma_unit = gauss_zcdp_sigma(1.0, 1e-8, 1.0, 1).expect("sigma");
        let sigma_scaled = gauss_zcdp_sigma(1.0, 1e-8, 7.5, 1).expect("sigma");
        assert!((sigma_scaled - 7.5 * sigma_unit).abs() <= 1e-9 * sigma_scaled);
    }

    #[test]
    fn compositions_split_the_budget() {
        let one = total_rho(3.0, 1e-9, 1.0, 1).expect("rho");
        let four = total_rho(3.0, 1e-9, 1.0, 4).expect("rho");
        assert!((four - one / 4.0).abs() <= 1e-12 * one);
    }

    #[test]
    fn rejects_documented_preconditions() {
        for (eps, delta, sens, k) in [
            (0.0, 1e-6, 1.0, 1),
            (1.0, 0.0, 1.0, 1),
            (1.0, 1.0, 1.0, 1),
            (1.0, 1e-6, 0.0, 1),
            (1.0, 1e-6, 1.0, 0),
        ] {
            let err = total_rho(eps, delta, sens, k).expect_err("must reject");
            assert_eq!(err.kind(), DpErrorKind::InvalidPrivacyParameter);
        }
    }

    #[test]
    fn accountant_uses_configured_conversion() {
        let params = PrivacyParameters::new(1.0, 1e-6, 1.0).expect("params");
        let closed = CompositionAccountant::default()
            .total_rho(&params, 1)
            .expect("rho");
        let analytic = CompositionAccountant::new(ZcdpConversion::AnalyticGaussian)
            .total_rho(&params, 1)
            .expect("rho");
        assert!(analytic > closed);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn total_rho_is_monotone_in_epsilon(
            eps_a in 0.01f64..50.0,
            eps_b in 0.01f64..50.0,
            log_delta in -20.0f64..-3.0,
            sensitivity in 0.1f64..10.0,
            k in 1u64..16,
        ) {
            let delta = 10f64.powf(log_delta);
            let low = eps_a.min(eps_b);
            let high = eps_a.max(eps_b);
            let rho_low = total_rho(low, delta, sensitivity, k).expect("rho");
            let rho_high = total_rho(high, delta, sensitivity, k).expect("rho");
            prop_assert!(rho_low > 0.0);
            prop_assert!(rho_high >= rho_low);
        }
    }
}
