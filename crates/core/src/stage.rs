//! Names of the synthesis pipeline stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stage of a synthesis run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Loading the processed dataset and deriving the run's privacy parameters.
    Initialization,
    /// Converting epsilon to rho and splitting it across stages.
    BudgetAllocation,
    /// Choosing (or loading) the marginal set.
    MarginalSelection,
    /// Deriving the binning noise scale.
    SigmaCalibration,
    /// Recoding attributes with the calibrated noise.
    AttributeRecoding,
    /// Final conservation check and audit line.
    Completion,
}

impl Stage {
    /// Stable snake_case name used in logs and audit records.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initialization => "initialization",
            Stage::BudgetAllocation => "budget_allocation",
            Stage::MarginalSelection => "marginal_selection",
            Stage::SigmaCalibration => "sigma_calibration",
            Stage::AttributeRecoding => "attribute_recoding",
            Stage::Completion => "completion",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
