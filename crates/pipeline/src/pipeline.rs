//! Typed synthesis pipeline.
//!
//! ```text
//! Initialized ─allocate_budget─▶ BudgetAllocated
//!     ─select_marginals─▶ MarginalsSelected
//!     ─calibrate_sigma─▶ SigmaCalibrated
//!     ─recode_attributes─▶ AttributesRecoded
//!     ─finish─▶ Complete
//! ```
//!
//! Each state can only be built by consuming the one before it, so a stage
//! cannot run before the value it depends on exists. Any error aborts the run
//! and reports the stage it came from.

use tracing::{debug, info};

use netdpsyn_accounting::{PrivacyBudget, SigmaAllocation};
use netdpsyn_core::{BoxError, DpError, Stage};

use crate::audit::{AuditRecord, AuditTrail, RunState};
use crate::collab::{AttributeRecoder, DataStore, Dataset, MarginalSelector, SelectionConfig};
use crate::config::{ConfigWarning, SynthesisConfig};
use crate::error::{SynthError, SynthResult};
use crate::marginal::MarginalSet;

fn collaborator_failure(stage: Stage) -> impl FnOnce(BoxError) -> SynthError {
    move |source| SynthError::Stage {
        stage,
        source: DpError::collaborator(source),
    }
}

/// State shared by every stage of one run.
struct RunContext<S: DataStore> {
    config: SynthesisConfig,
    warnings: Vec<ConfigWarning>,
    store: S,
    dataset: S::Dataset,
    audit: AuditTrail,
}

impl<S: DataStore> RunContext<S> {
    fn record(
        &mut self,
        state: RunState,
        budget: &PrivacyBudget,
        binning_sigma: Option<f64>,
        note: Option<String>,
    ) {
        let mut record =
            AuditRecord::snapshot(state, &self.config.dataset_name, budget, binning_sigma);
        if let Some(note) = note {
            record = record.with_note(note);
        }
        self.audit.append(record);
    }
}

/// Dataset loaded, configuration validated.
pub struct Initialized<S: DataStore> {
    ctx: RunContext<S>,
}

impl<S: DataStore> Initialized<S> {
    /// Validate `config`, load the processed dataset and persist its original marginals.
    pub fn new(config: SynthesisConfig, store: S) -> SynthResult<Self> {
        let warnings = config.validate()?;

        info!(dataset = %config.dataset_name, "loading dataset");
        let dataset = store
            .load_processed_data()
            .map_err(collaborator_failure(Stage::Initialization))?;
        info!(
            dataset = %config.dataset_name,
            num_records = dataset.num_records(),
            num_attributes = dataset.num_attributes(),
            domain_size = dataset.domain_size(),
            "dataset loaded"
        );

        store
            .save_original(&dataset)
            .map_err(collaborator_failure(Stage::Initialization))?;
        debug!(state = %RunState::Initialized, "run initialized");

        Ok(Self {
            ctx: RunContext {
                config,
                warnings,
                store,
                dataset,
                audit: AuditTrail::new(),
            },
        })
    }

    /// The loaded dataset.
    pub fn dataset(&self) -> &S::Dataset {
        &self.ctx.dataset
    }

    /// Warnings raised while validating the configuration.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.ctx.warnings
    }

    /// Convert epsilon to a total rho and split it across stages.
    pub fn allocate_budget(self) -> SynthResult<BudgetAllocated<S>> {
        let mut ctx = self.ctx;
        let params = ctx
            .config
            .privacy_parameters(ctx.dataset.num_records())
            .map_err(SynthError::at(Stage::BudgetAllocation))?;
        let budget = PrivacyBudget::allocate(
            params,
            ctx.config.resolve_ratios(),
            &ctx.config.accountant(),
            ctx.config.num_compositions,
        )
        .map_err(SynthError::at(Stage::BudgetAllocation))?;

        let note = budget.rho().normalization().map(|n| {
            format!(
                "ratios summing to {} normalized to ({}, {}, {})",
                n.requested_sum, n.applied.binning, n.applied.selection, n.applied.publish
            )
        });
        ctx.record(RunState::BudgetAllocated, &budget, None, note);
        Ok(BudgetAllocated { ctx, budget })
    }
}

/// Rho split across stages.
pub struct BudgetAllocated<S: DataStore> {
    ctx: RunContext<S>,
    budget: PrivacyBudget,
}

impl<S: DataStore> BudgetAllocated<S> {
    /// The run's budget.
    pub fn budget(&self) -> &PrivacyBudget {
        &self.budget
    }

    /// What marginal selection receives: the selection and publish budgets,
    /// never the binning one.
    pub fn selection_config(&self) -> SelectionConfig {
        let rho = self.budget.rho();
        SelectionConfig {
            total_epsilon: self.budget.params().epsilon(),
            depend_epsilon: self.budget.depend_epsilon(),
            selection_rho: rho.selection(),
            publish_rho: rho.publish(),
            total_rho: rho.total(),
            delta: self.budget.params().delta(),
            threshold: self.ctx.config.selection_threshold,
            initial_marginals: self.ctx.config.initial_marginals.clone(),
        }
    }

    /// Select marginals, or load cached ones when the run is configured to.
    pub fn select_marginals<M>(self, selector: &M) -> SynthResult<MarginalsSelected<S>>
    where
        M: MarginalSelector<S::Dataset> + ?Sized,
    {
        let (marginals, note) = if self.ctx.config.is_cal_marginals {
            let config = self.selection_config();
            info!(
                selection_rho = config.selection_rho,
                depend_epsilon = config.depend_epsilon,
                threshold = config.threshold,
                "selecting marginals"
            );
            let marginals = selector
                .select_marginals(&self.ctx.dataset, &config)
                .map_err(collaborator_failure(Stage::MarginalSelection))?;
            self.ctx
                .store
                .save_marginal(&marginals)
                .map_err(collaborator_failure(Stage::MarginalSelection))?;
            (marginals, "selected")
        } else {
            info!(dataset = %self.ctx.config.dataset_name, "loading cached marginals");
            let marginals = self
                .ctx
                .store
                .load_marginal()
                .map_err(collaborator_failure(Stage::MarginalSelection))?;
            (marginals, "loaded from cache")
        };

        let Self { mut ctx, budget } = self;
        ctx.record(
            RunState::MarginalsSelected,
            &budget,
            None,
            Some(format!("{} marginals {note}", marginals.len())),
        );
        Ok(MarginalsSelected {
            ctx,
            budget,
            marginals,
        })
    }
}

/// Marginal set fixed.
pub struct MarginalsSelected<S: DataStore> {
    ctx: RunContext<S>,
    budget: PrivacyBudget,
    marginals: MarginalSet,
}

impl<S: DataStore> MarginalsSelected<S> {
    /// The run's budget.
    pub fn budget(&self) -> &PrivacyBudget {
        &self.budget
    }

    /// The marginals to publish.
    pub fn marginals(&self) -> &MarginalSet {
        &self.marginals
    }

    /// Derive the binning noise scale from the binning rho and the attribute count.
    pub fn calibrate_sigma(self) -> SynthResult<SigmaCalibrated<S>> {
        let Self {
            mut ctx,
            budget,
            marginals,
        } = self;
        let attribute_count = i64::try_from(ctx.dataset.num_attributes()).unwrap_or(i64::MAX);
        let binning = SigmaAllocation::calibrate(
            budget.rho().binning(),
            attribute_count,
            budget.params().sensitivity(),
        )
        .map_err(SynthError::at(Stage::SigmaCalibration))?;

        ctx.record(RunState::SigmaCalibrated, &budget, Some(binning.sigma()), None);
        Ok(SigmaCalibrated {
            ctx,
            budget,
            marginals,
            binning,
        })
    }
}

/// Binning noise scale derived.
pub struct SigmaCalibrated<S: DataStore> {
    ctx: RunContext<S>,
    budget: PrivacyBudget,
    marginals: MarginalSet,
    binning: SigmaAllocation,
}

impl<S: DataStore> SigmaCalibrated<S> {
    /// The binning calibration.
    pub fn binning(&self) -> &SigmaAllocation {
        &self.binning
    }

    /// Recode attributes with the calibrated sigma.
    pub fn recode_attributes<R>(self, recoder: &R) -> SynthResult<AttributesRecoded<S, R::Output>>
    where
        R: AttributeRecoder<S::Dataset> + ?Sized,
    {
        let Self {
            mut ctx,
            budget,
            marginals,
            binning,
        } = self;
        let recoded = recoder
            .recode(&ctx.dataset, binning.sigma())
            .map_err(collaborator_failure(Stage::AttributeRecoding))?;

        ctx.record(RunState::AttributesRecoded, &budget, Some(binning.sigma()), None);
        Ok(AttributesRecoded {
            ctx,
            budget,
            marginals,
            binning,
            recoded,
        })
    }
}

/// Attributes recoded.
pub struct AttributesRecoded<S: DataStore, O> {
    ctx: RunContext<S>,
    budget: PrivacyBudget,
    marginals: MarginalSet,
    binning: SigmaAllocation,
    recoded: O,
}

impl<S: DataStore, O> AttributesRecoded<S, O> {
    /// The recoder's output.
    pub fn recoded(&self) -> &O {
        &self.recoded
    }

    /// Verify the budget adds up and write the final audit line.
    pub fn finish(self) -> SynthResult<Complete<S, O>> {
        let Self {
            mut ctx,
            budget,
            marginals,
            binning,
            recoded,
        } = self;
        budget
            .rho()
            .check_conservation()
            .map_err(SynthError::at(Stage::Completion))?;

        let rho = budget.rho();
        info!(
            dataset = %ctx.config.dataset_name,
            total_rho = rho.total(),
            binning_rho = rho.binning(),
            selection_rho = rho.selection(),
            publish_rho = rho.publish(),
            binning_sigma = binning.sigma(),
            "synthesis accounting complete"
        );
        ctx.record(RunState::Complete, &budget, Some(binning.sigma()), None);
        Ok(Complete {
            ctx,
            budget,
            marginals,
            binning,
            recoded,
        })
    }
}

/// A finished run.
pub struct Complete<S: DataStore, O> {
    ctx: RunContext<S>,
    budget: PrivacyBudget,
    marginals: MarginalSet,
    binning: SigmaAllocation,
    recoded: O,
}

impl<S: DataStore, O> Complete<S, O> {
    /// Configuration the run used.
    pub fn config(&self) -> &SynthesisConfig {
        &self.ctx.config
    }

    /// Warnings raised while validating the configuration.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.ctx.warnings
    }

    /// The data store.
    pub fn store(&self) -> &S {
        &self.ctx.store
    }

    /// The loaded dataset.
    pub fn dataset(&self) -> &S::Dataset {
        &self.ctx.dataset
    }

    /// Parameters and budget split.
    pub fn budget(&self) -> &PrivacyBudget {
        &self.budget
    }

    /// Published marginal set.
    pub fn marginals(&self) -> &MarginalSet {
        &self.marginals
    }

    /// Binning calibration.
    pub fn binning(&self) -> &SigmaAllocation {
        &self.binning
    }

    /// The recoder's output.
    pub fn recoded(&self) -> &O {
        &self.recoded
    }

    /// The audit trail, one record per transition.
    pub fn audit(&self) -> &AuditTrail {
        &self.ctx.audit
    }

    /// Take the recoder's output and the audit trail.
    pub fn into_parts(self) -> (O, AuditTrail) {
        (self.recoded, self.ctx.audit)
    }
}

/// Run every stage in order.
pub fn run<S, M, R>(
    config: SynthesisConfig,
    store: S,
    selector: &M,
    recoder: &R,
) -> SynthResult<Complete<S, R::Output>>
where
    S: DataStore,
    M: MarginalSelector<S::Dataset> + ?Sized,
    R: AttributeRecoder<S::Dataset> + ?Sized,
{
    Initialized::new(config, store)?
        .allocate_budget()?
        .select_marginals(selector)?
        .calibrate_sigma()?
        .recode_attributes(recoder)?
        .finish()
}
