//! The full accounting chain for one run, without any collaborators.

use serde::Serialize;

use netdpsyn_core::Result;

use crate::{
    CompositionAccountant, EpsilonSplit, PrivacyBudget, PrivacyParameters, RhoBudget,
    SigmaAllocation, StageRatios,
};

/// Budget split and binning noise scale for a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BudgetPlan {
    budget: PrivacyBudget,
    binning: SigmaAllocation,
}

impl BudgetPlan {
    /// Accountant, then allocator, then calibrator on the binning share.
    pub fn compute(
        params: PrivacyParameters,
        ratios: StageRatios,
        accountant: &CompositionAccountant,
        num_compositions: u64,
        attribute_count: i64,
    ) -> Result<Self> {
        let budget = PrivacyBudget::allocate(params, ratios, accountant, num_compositions)?;
        Self::from_budget(budget, attribute_count)
    }

    /// Calibrate the binning sigma for an already allocated budget.
    pub fn from_budget(budget: PrivacyBudget, attribute_count: i64) -> Result<Self> {
        let binning = SigmaAllocation::calibrate(
            budget.rho().binning(),
            attribute_count,
            budget.params().sensitivity(),
        )?;
        Ok(Self { budget, binning })
    }

    /// Parameters and rho split.
    pub fn budget(&self) -> &PrivacyBudget {
        &self.budget
    }

    /// Rho-domain split.
    pub fn rho(&self) -> &RhoBudget {
        self.budget.rho()
    }

    /// Epsilon-domain split.
    pub fn epsilon_split(&self) -> EpsilonSplit {
        self.budget.epsilon_split()
    }

    /// Binning noise calibration.
    pub fn binning(&self) -> &SigmaAllocation {
        &self.binning
    }

    /// Binning noise standard deviation.
    pub fn binning_sigma(&self) -> f64 {
        self.binning.sigma()
    }
}
