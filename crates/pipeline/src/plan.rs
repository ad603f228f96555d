//! Budget planning straight from a configuration.

use netdpsyn_accounting::{BudgetPlan, PrivacyBudget};
use netdpsyn_core::Stage;

use crate::config::SynthesisConfig;
use crate::error::{SynthError, SynthResult};

/// Run the accounting chain for a dataset of the given shape.
///
/// Errors carry the stage a full run would have failed in.
pub fn plan_budget(
    config: &SynthesisConfig,
    num_records: usize,
    num_attributes: usize,
) -> SynthResult<BudgetPlan> {
    config.validate()?;
    let params = config
        .privacy_parameters(num_records)
        .map_err(SynthError::at(Stage::BudgetAllocation))?;
    let budget = PrivacyBudget::allocate(
        params,
        config.resolve_ratios(),
        &config.accountant(),
        config.num_compositions,
    )
    .map_err(SynthError::at(Stage::BudgetAllocation))?;
    let attribute_count = i64::try_from(num_attributes).unwrap_or(i64::MAX);
    BudgetPlan::from_budget(budget, attribute_count)
        .map_err(SynthError::at(Stage::SigmaCalibration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdpsyn_core::DpErrorKind;

    #[test]
    fn plan_uses_record_count_for_delta() {
        let plan = plan_budget(&SynthesisConfig::new(2.0), 1000, 8).expect("plan");
        assert_eq!(plan.budget().params().delta(), 1e-6);
        assert_eq!(plan.binning().attribute_count(), 8);
    }

    #[test]
    fn zero_records_fail_in_budget_allocation() {
        let err = plan_budget(&SynthesisConfig::new(2.0), 0, 8).expect_err("no records");
        assert_eq!(err.stage(), Some(Stage::BudgetAllocation));
        assert_eq!(err.dp_kind(), Some(DpErrorKind::InvalidPrivacyParameter));
    }
}
