//! Conversions between (epsilon, delta)-DP and zero-concentrated DP.
//!
//! A rho-zCDP mechanism satisfies (alpha, alpha * rho)-RDP for every Rényi
//! order alpha > 1, so the Rényi conversions below are evaluated over a fixed
//! grid of orders.

use serde::{Deserialize, Serialize};

use netdpsyn_core::{DpError, Result};

use crate::analytic::{epsilon_for_gaussian_sigma, sigma_for_gaussian_eps_delta};
use crate::calibrate::{largest_within, SearchTolerance};

/// How a target (epsilon, delta) is turned into a total zCDP budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZcdpConversion {
    /// Closed-form inverse of `eps = rho + 2 sqrt(rho ln(1/delta))`.
    #[default]
    BunSteinke,
    /// Tight Rényi-order conversion, inverted by bisection.
    Renyi,
    /// Exact Gaussian-mechanism curve, inverted by bisection on sigma.
    AnalyticGaussian,
}

impl ZcdpConversion {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ZcdpConversion::BunSteinke => "bun_steinke",
            ZcdpConversion::Renyi => "renyi",
            ZcdpConversion::AnalyticGaussian => "analytic_gaussian",
        }
    }

    /// Largest total rho whose conversion stays within (epsilon, delta).
    pub fn rho_for_epsilon(self, epsilon: f64, delta: f64) -> Result<f64> {
        validate_eps_delta(epsilon, delta)?;
        let rho = match self {
            ZcdpConversion::BunSteinke => bun_steinke_rho(epsilon, delta),
            ZcdpConversion::Renyi => {
                // The closed form is looser, so its rho is a good first bracket.
                largest_within(
                    |rho| renyi_epsilon(rho, delta),
                    epsilon,
                    0.0,
                    bun_steinke_rho(epsilon, delta),
                    SearchTolerance::default(),
                )?
            }
            ZcdpConversion::AnalyticGaussian => {
                let sigma = sigma_for_gaussian_eps_delta(epsilon, delta)?;
                1.0 / (2.0 * sigma * sigma)
            }
        };
        if !rho.is_finite() || rho <= 0.0 {
            return Err(DpError::numerical(format!(
                "{} conversion produced rho={rho}",
                self.as_str()
            )));
        }
        Ok(rho)
    }

    /// Epsilon guaranteed at `delta` by a mechanism with total cost `rho`.
    pub fn epsilon_for_rho(self, rho: f64, delta: f64) -> Result<f64> {
        if !rho.is_finite() || rho < 0.0 {
            return Err(DpError::InvalidBudget { value: rho });
        }
        if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
            return Err(DpError::invalid_param("delta", delta, "must be in (0, 1)"));
        }
        if rho == 0.0 {
            return Ok(0.0);
        }
        match self {
            ZcdpConversion::BunSteinke => Ok(bun_steinke_epsilon(rho, delta)),
            ZcdpConversion::Renyi => Ok(renyi_epsilon(rho, delta)),
            ZcdpConversion::AnalyticGaussian => {
                epsilon_for_gaussian_sigma((1.0 / (2.0 * rho)).sqrt(), delta)
            }
        }
    }
}

fn validate_eps_delta(epsilon: f64, delta: f64) -> Result<()> {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(DpError::invalid_param(
            "epsilon",
            epsilon,
            "must be finite and > 0",
        ));
    }
    if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
        return Err(DpError::invalid_param("delta", delta, "must be in (0, 1)"));
    }
    Ok(())
}

/// Largest rho with `rho + 2 sqrt(rho L) <= epsilon`, `L = ln(1/delta)`.
fn bun_steinke_rho(epsilon: f64, delta: f64) -> f64 {
    let log_delta_inv = (1.0 / delta).ln();
    // sqrt(L + eps) - sqrt(L), rewritten to avoid cancellation when eps << L.
    let root = epsilon / ((log_delta_inv + epsilon).sqrt() + log_delta_inv.sqrt());
    let mut rho = root * root;
    // Rounding can leave the closed form a few ulps above the target.
    for _ in 0..64 {
        if bun_steinke_epsilon(rho, delta) <= epsilon {
            break;
        }
        rho *= 1.0 - f64::EPSILON;
    }
    rho
}

fn bun_steinke_epsilon(rho: f64, delta: f64) -> f64 {
    rho + 2.0 * (rho * (1.0 / delta).ln()).sqrt()
}

/// Tight conversion of rho-zCDP to (eps, delta)-DP, never worse than Bun–Steinke.
fn renyi_epsilon(rho: f64, delta: f64) -> f64 {
    let log_delta = delta.ln();
    let mut best = bun_steinke_epsilon(rho, delta);
    for alpha in default_orders() {
        let eps = alpha * rho + (1.0 - 1.0 / alpha).ln() - (log_delta + alpha.ln()) / (alpha - 1.0);
        if eps < best {
            best = eps;
        }
    }
    best.max(0.0)
}

/// Rényi orders used by the tight conversion.
///
/// - `linspace(1.01, 8, num=50)`
/// - `arange(8, 64)`
/// - `linspace(65, 512, num=10)` rounded
/// - powers of two from 1024 to 65536 for very small budgets
pub fn default_orders() -> Vec<f64> {
    let mut orders = Vec::new();

    orders.extend(linspace(1.01, 8.0, 50));
    for a in 8..64 {
        orders.push(a as f64);
    }
    for a in linspace(65.0, 512.0, 10) {
        orders.push(a.round());
    }
    for shift in 10..=16 {
        orders.push((1u64 << shift) as f64);
    }

    orders
}

fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    if num == 1 {
        return vec![start];
    }
    let step = (end - start) / (num as f64 - 1.0);
    (0..num).map(|i| start + step * i as f64).collect()
}
