//! Monotone bracket-and-bisect searches used by the zCDP conversions.

use netdpsyn_core::{DpError, Result};

const MAX_EXPANSIONS: usize = 200;

/// Search settings shared by the calibration routines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchTolerance {
    /// Stop once `hi - lo <= rel_tol * hi`.
    pub rel_tol: f64,
    /// Upper bound on bisection steps.
    pub max_iters: usize,
}

impl Default for SearchTolerance {
    fn default() -> Self {
        Self {
            rel_tol: 1e-12,
            max_iters: 200,
        }
    }
}

/// Largest `x >= lower` with `f(x) <= target`, for `f` non-decreasing.
///
/// `lower` must already satisfy the target. The upper end is found by doubling
/// from `initial_upper`. The returned value always satisfies the target, so the
/// search errs on the conservative side.
pub fn largest_within(
    f: impl Fn(f64) -> f64,
    target: f64,
    lower: f64,
    initial_upper: f64,
    tol: SearchTolerance,
) -> Result<f64> {
    if !target.is_finite() {
        return Err(DpError::numerical("search target must be finite"));
    }
    let mut lo = lower.max(0.0);
    if f(lo) > target {
        return Err(DpError::numerical(
            "lower end of the search already exceeds the target",
        ));
    }

    let mut hi = initial_upper.max(lo * 2.0).max(f64::MIN_POSITIVE);
    let mut expansions = 0usize;
    while f(hi) <= target {
        lo = hi;
        hi *= 2.0;
        expansions += 1;
        if !hi.is_finite() || expansions >= MAX_EXPANSIONS {
            return Err(DpError::numerical(
                "failed to bracket a value exceeding the target",
            ));
        }
    }

    for _ in 0..tol.max_iters.max(1) {
        if hi - lo <= tol.rel_tol * hi {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if f(mid) <= target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(lo)
}

/// Smallest `x > 0` with `f(x) <= target`, for `f` non-increasing.
///
/// Mirrors [`largest_within`] for quantities such as the privacy loss of a
/// Gaussian mechanism, which shrinks as the noise grows.
pub fn smallest_within(
    f: impl Fn(f64) -> f64,
    target: f64,
    initial_lower: f64,
    initial_upper: f64,
    tol: SearchTolerance,
) -> Result<f64> {
    if !target.is_finite() {
        return Err(DpError::numerical("search target must be finite"));
    }
    let mut lo = initial_lower.max(f64::MIN_POSITIVE);
    if f(lo) <= target {
        return Ok(lo);
    }

    let mut hi = initial_upper.max(lo * 2.0);
    let mut expansions = 0usize;
    while f(hi) > target {
        lo = hi;
        hi *= 2.0;
        expansions += 1;
        if !hi.is_finite() || expansions >= MAX_EXPANSIONS {
            return Err(DpError::numerical(
                "failed to bracket a value achieving the target",
            ));
        }
    }

    for _ in 0..tol.max_iters.max(1) {
        if hi - lo <= tol.rel_tol * hi {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if f(mid) <= target {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Ok(hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn largest_within_finds_square_root() {
        let x = largest_within(|x| x * x, 2.0, 0.0, 1.0, SearchTolerance::default())
            .expect("bracketed");
        assert!(x * x <= 2.0);
        assert!((x - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn smallest_within_finds_reciprocal() {
        let x = smallest_within(|x| 1.0 / x, 0.25, 1e-6, 1.0, SearchTolerance::default())
            .expect("bracketed");
        assert!(1.0 / x <= 0.25);
        assert!((x - 4.0).abs() < 1e-9);
    }

    #[test]
    fn largest_within_rejects_infeasible_lower() {
        let res = largest_within(|x| x + 10.0, 1.0, 0.0, 1.0, SearchTolerance::default());
        assert!(res.is_err());
    }

    #[test]
    fn largest_within_fails_on_unbounded_feasible_set() {
        let res = largest_within(|_| 0.0, 1.0, 0.0, 1.0, SearchTolerance::default());
        assert!(res.is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

        #[test]
        fn largest_within_result_meets_target(target in 0.01f64..1e4) {
            let x = largest_within(|x| x.powi(3), target, 0.0, 1.0, SearchTolerance::default())
                .expect("bracketed");
            prop_assert!(x.powi(3) <= target);
        }
    }
}
