//! Privacy-budget accounting for differentially private record synthesis.
//!
//! The pieces chain strictly downward: an (epsilon, delta) target becomes a
//! total zCDP cost ([`CompositionAccountant`]), the total is split across the
//! binning, selection and publish stages ([`allocate`]), and a stage's share
//! becomes a Gaussian noise scale ([`sigma_for_rho`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytic;
pub mod budget;
pub mod calibrate;
pub mod composition;
pub mod params;
pub mod plan;
pub mod sigma;
pub mod zcdp;

pub use analytic::{epsilon_for_gaussian_sigma, sigma_for_gaussian_eps_delta};
pub use budget::{
    allocate, EpsilonSplit, PrivacyBudget, RatioNormalization, RhoBudget, CONSERVATION_TOLERANCE,
};
pub use calibrate::{largest_within, smallest_within, SearchTolerance};
pub use composition::{gauss_zcdp_sigma, total_rho, CompositionAccountant};
pub use params::{delta_for_records, PrivacyParameters, StageRatios, RATIO_SUM_TOLERANCE};
pub use plan::BudgetPlan;
pub use sigma::{sigma_for_rho, SigmaAllocation, RHO_FLOOR};
pub use zcdp::{default_orders, ZcdpConversion};

/// Common imports for privacy accounting.
pub mod prelude {
    pub use crate::{
        allocate, delta_for_records, gauss_zcdp_sigma, sigma_for_rho, total_rho, BudgetPlan,
        CompositionAccountant, EpsilonSplit, PrivacyBudget, PrivacyParameters,
        RatioNormalization, RhoBudget, SigmaAllocation, StageRatios, ZcdpConversion,
    };
}
