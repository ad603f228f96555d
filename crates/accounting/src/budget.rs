//! Splitting a total zCDP budget across the binning, selection and publish stages.

use serde::Serialize;
use tracing::{debug, warn};

use netdpsyn_core::{DpError, Result};

use crate::{CompositionAccountant, PrivacyParameters, StageRatios};

/// Absolute tolerance (scaled by `max(total, 1)`) for the conservation check.
pub const CONSERVATION_TOLERANCE: f64 = 1e-9;

/// Record of a ratio triple that had to be rescaled before use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RatioNormalization {
    /// Ratios as configured.
    pub requested: StageRatios,
    /// Their sum before rescaling.
    pub requested_sum: f64,
    /// Ratios actually used, summing to one.
    pub applied: StageRatios,
}

/// Per-stage rho allocations. Stage allocations always add up to the total.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RhoBudget {
    total: f64,
    binning: f64,
    selection: f64,
    publish: f64,
    ratios: StageRatios,
    normalization: Option<RatioNormalization>,
}

/// Epsilon-domain view of the split, for stages using a Laplace-style mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EpsilonSplit {
    /// Epsilon for dependency/marginal selection.
    pub depend_epsilon: f64,
    /// Epsilon left for publishing.
    pub remain_epsilon: f64,
}

impl RhoBudget {
    /// Total rho that was split.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Rho for binning/recoding.
    pub fn binning(&self) -> f64 {
        self.binning
    }

    /// Rho for marginal selection.
    pub fn selection(&self) -> f64 {
        self.selection
    }

    /// Rho for publishing noisy marginals.
    pub fn publish(&self) -> f64 {
        self.publish
    }

    /// Ratios the split was computed from (after any normalization).
    pub fn ratios(&self) -> StageRatios {
        self.ratios
    }

    /// The rescaling applied to the configured ratios, if any.
    pub fn normalization(&self) -> Option<&RatioNormalization> {
        self.normalization.as_ref()
    }

    /// Whether the configured ratios had to be rescaled.
    pub fn was_normalized(&self) -> bool {
        self.normalization.is_some()
    }

    /// Sum of the three stage allocations.
    pub fn allocated(&self) -> f64 {
        self.binning + self.selection + self.publish
    }

    /// Epsilon-domain projection of the same ratios.
    pub fn epsilon_split(&self, epsilon: f64) -> EpsilonSplit {
        EpsilonSplit {
            depend_epsilon: epsilon * self.ratios.selection,
            remain_epsilon: epsilon * self.ratios.publish,
        }
    }

    /// Fail unless the stage allocations add back up to the total.
    pub fn check_conservation(&self) -> Result<()> {
        let allocated = self.allocated();
        let tolerance = CONSERVATION_TOLERANCE * self.total.max(1.0);
        if !allocated.is_finite() || (allocated - self.total).abs() > tolerance {
            return Err(DpError::BudgetNotConserved {
                total: self.total,
                allocated,
            });
        }
        Ok(())
    }
}

/// Split `total_rho` across stages in proportion to `ratios`.
///
/// Ratios that do not sum to one are rescaled; the rescaling is logged at warn
/// level and kept on the returned budget.
pub fn allocate(total_rho: f64, ratios: StageRatios) -> Result<RhoBudget> {
    if !total_rho.is_finite() || total_rho < 0.0 {
        return Err(DpError::InvalidBudget { value: total_rho });
    }
    ratios.validate()?;

    let (applied, normalization) = if ratios.is_normalized() {
        (ratios, None)
    } else {
        let applied = ratios.rescaled();
        warn!(
            requested_sum = ratios.sum(),
            binning = applied.binning,
            selection = applied.selection,
            publish = applied.publish,
            "rho ratios normalized to sum to 1.0"
        );
        (
            applied,
            Some(RatioNormalization {
                requested: ratios,
                requested_sum: ratios.sum(),
                applied,
            }),
        )
    };

    let budget = RhoBudget {
        total: total_rho,
        binning: total_rho * applied.binning,
        selection: total_rho * applied.selection,
        publish: total_rho * applied.publish,
        ratios: applied,
        normalization,
    };
    budget.check_conservation()?;

    debug!(
        total = budget.total,
        binning = budget.binning,
        selection = budget.selection,
        publish = budget.publish,
        "rho budget allocated"
    );
    Ok(budget)
}

/// A run's privacy parameters together with the rho split derived from them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PrivacyBudget {
    params: PrivacyParameters,
    num_compositions: u64,
    rho: RhoBudget,
}

impl PrivacyBudget {
    /// Run the accountant on `params`, then split the resulting rho by `ratios`.
    pub fn allocate(
        params: PrivacyParameters,
        ratios: StageRatios,
        accountant: &CompositionAccountant,
        num_compositions: u64,
    ) -> Result<Self> {
        let total = accountant.total_rho(&params, num_compositions)?;
        let rho = allocate(total, ratios)?;
        Ok(Self {
            params,
            num_compositions,
            rho,
        })
    }

    /// The parameters the budget was derived from.
    pub fn params(&self) -> &PrivacyParameters {
        &self.params
    }

    /// Number of Gaussian compositions the total rho accounts for.
    pub fn num_compositions(&self) -> u64 {
        self.num_compositions
    }

    /// The rho-domain split.
    pub fn rho(&self) -> &RhoBudget {
        &self.rho
    }

    /// The epsilon-domain split.
    pub fn epsilon_split(&self) -> EpsilonSplit {
        self.rho.epsilon_split(self.params.epsilon())
    }

    /// `epsilon * selection_ratio`.
    pub fn depend_epsilon(&self) -> f64 {
        self.epsilon_split().depend_epsilon
    }

    /// `epsilon * publish_ratio`.
    pub fn remain_epsilon(&self) -> f64 {
        self.epsilon_split().remain_epsilon
    }
}
