//! Differentially private network-flow synthesis: configuration, collaborator
//! interfaces and the typed pipeline that spends a zCDP budget across the
//! binning, selection and publish stages.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod collab;
pub mod config;
pub mod error;
pub mod marginal;
pub mod paths;
pub mod pipeline;
pub mod plan;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use netdpsyn_accounting as accounting;
pub use netdpsyn_core as core;

pub use accounting::{
    BudgetPlan, PrivacyBudget, RhoBudget, SigmaAllocation, StageRatios, ZcdpConversion,
};
pub use audit::{AuditRecord, AuditTrail, RunState, AUDIT_TARGET};
pub use collab::{AttributeRecoder, DataStore, Dataset, MarginalSelector, SelectionConfig};
pub use config::{ConfigWarning, SynthesisConfig, DEFAULT_SELECTION_THRESHOLD};
pub use error::{ConfigError, SynthError, SynthResult};
pub use marginal::{default_initial_marginals, MarginalCache, MarginalSet, MarginalSpec};
pub use paths::DataPaths;
pub use pipeline::{
    run, AttributesRecoded, BudgetAllocated, Complete, Initialized, MarginalsSelected,
    SigmaCalibrated,
};
pub use plan::plan_budget;

/// Common imports for running a synthesis pipeline.
pub mod prelude {
    pub use crate::{
        plan_budget, run, AttributeRecoder, AuditTrail, DataStore, Dataset, Initialized,
        MarginalSelector, MarginalSet, MarginalSpec, SelectionConfig, SynthError, SynthResult,
        SynthesisConfig,
    };
    pub use netdpsyn_accounting::prelude::*;
    pub use netdpsyn_core::prelude::*;
}
