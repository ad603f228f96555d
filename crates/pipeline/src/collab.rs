//! Interfaces to the components the orchestrator drives but does not own:
//! dataset storage, marginal selection and attribute recoding.
//!
//! Collaborator failures are opaque [`BoxError`]s; the orchestrator wraps them
//! in [`netdpsyn_core::DpError::CollaboratorFailure`] without inspecting them.

use serde::Serialize;

use netdpsyn_core::BoxError;

use crate::marginal::{MarginalSet, MarginalSpec};

/// A loaded tabular dataset.
pub trait Dataset {
    /// Number of records.
    fn num_records(&self) -> usize;

    /// Number of attributes (columns).
    fn num_attributes(&self) -> usize;

    /// Size of the joint attribute domain.
    fn domain_size(&self) -> f64;
}

/// Loads datasets and persists marginals.
pub trait DataStore {
    /// The dataset type this store produces.
    type Dataset: Dataset;

    /// Load the preprocessed dataset.
    fn load_processed_data(&self) -> Result<Self::Dataset, BoxError>;

    /// Persist the one-way marginals of the loaded data, keyed `"original"`.
    fn save_original(&self, _dataset: &Self::Dataset) -> Result<(), BoxError> {
        Ok(())
    }

    /// Persist selected marginals.
    fn save_marginal(&self, marginals: &MarginalSet) -> Result<(), BoxError>;

    /// Load previously selected marginals.
    fn load_marginal(&self) -> Result<MarginalSet, BoxError>;
}

/// Budget and tuning handed to marginal selection.
///
/// Never carries the binning budget.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct SelectionConfig {
    /// Run-level epsilon.
    pub total_epsilon: f64,
    /// Epsilon-domain share for selection (`epsilon * selection_ratio`).
    pub depend_epsilon: f64,
    /// Rho for selection.
    pub selection_rho: f64,
    /// Rho reserved for publishing the selected marginals.
    pub publish_rho: f64,
    /// Total rho of the run.
    pub total_rho: f64,
    /// Run delta.
    pub delta: f64,
    /// Domain-size threshold for candidate marginals.
    pub threshold: u64,
    /// Marginals every selection starts from.
    pub initial_marginals: Vec<MarginalSpec>,
}

/// Chooses the marginals to publish.
pub trait MarginalSelector<D: ?Sized> {
    /// Select marginals from `dataset` within the budget in `config`.
    fn select_marginals(&self, dataset: &D, config: &SelectionConfig)
        -> Result<MarginalSet, BoxError>;
}

impl<D: ?Sized, F> MarginalSelector<D> for F
where
    F: Fn(&D, &SelectionConfig) -> Result<MarginalSet, BoxError>,
{
    fn select_marginals(
        &self,
        dataset: &D,
        config: &SelectionConfig,
    ) -> Result<MarginalSet, BoxError> {
        self(dataset, config)
    }
}

/// Buckets rare attribute values using Gaussian noise of a given scale.
pub trait AttributeRecoder<D: ?Sized> {
    /// Recoded dataset or handle.
    type Output;

    /// Recode `dataset` with noise standard deviation `sigma`.
    fn recode(&self, dataset: &D, sigma: f64) -> Result<Self::Output, BoxError>;
}

impl<D: ?Sized, F, O> AttributeRecoder<D> for F
where
    F: Fn(&D, f64) -> Result<O, BoxError>,
{
    type Output = O;

    fn recode(&self, dataset: &D, sigma: f64) -> Result<O, BoxError> {
        self(dataset, sigma)
    }
}
