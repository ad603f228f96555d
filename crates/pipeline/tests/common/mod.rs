#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fmt;

use netdpsyn::core::BoxError;
use netdpsyn::{DataStore, Dataset, MarginalSet, MarginalSpec, SelectionConfig, SynthesisConfig};

/// Processed flow table of a fixed shape.
#[derive(Clone, Debug)]
pub struct FlowTable {
    pub records: usize,
    pub attributes: usize,
}

impl Dataset for FlowTable {
    fn num_records(&self) -> usize {
        self.records
    }

    fn num_attributes(&self) -> usize {
        self.attributes
    }

    fn domain_size(&self) -> f64 {
        256f64.powi(self.attributes as i32)
    }
}

#[derive(Debug)]
pub struct Unavailable(pub &'static str);

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable", self.0)
    }
}

impl std::error::Error for Unavailable {}

/// In-memory store recording what the pipeline asked of it.
pub struct MemoryStore {
    pub table: FlowTable,
    pub cached: RefCell<Option<MarginalSet>>,
    pub originals_saved: Cell<usize>,
    pub fail_load: bool,
}

impl MemoryStore {
    pub fn new(records: usize, attributes: usize) -> Self {
        Self {
            table: FlowTable {
                records,
                attributes,
            },
            cached: RefCell::new(None),
            originals_saved: Cell::new(0),
            fail_load: false,
        }
    }

    pub fn with_cached(self, marginals: MarginalSet) -> Self {
        self.cached.replace(Some(marginals));
        self
    }
}

impl DataStore for MemoryStore {
    type Dataset = FlowTable;

    fn load_processed_data(&self) -> Result<FlowTable, BoxError> {
        if self.fail_load {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "processed_data/flows.csv missing",
            )));
        }
        Ok(self.table.clone())
    }

    fn save_original(&self, _dataset: &FlowTable) -> Result<(), BoxError> {
        self.originals_saved.set(self.originals_saved.get() + 1);
        Ok(())
    }

    fn save_marginal(&self, marginals: &MarginalSet) -> Result<(), BoxError> {
        self.cached.replace(Some(marginals.clone()));
        Ok(())
    }

    fn load_marginal(&self) -> Result<MarginalSet, BoxError> {
        self.cached
            .borrow()
            .clone()
            .ok_or_else(|| Box::new(Unavailable("marginal cache")) as BoxError)
    }
}

/// Selection that keeps the initial marginals and adds one pair.
pub fn pairwise_selection(
    _: &FlowTable,
    config: &SelectionConfig,
) -> Result<MarginalSet, BoxError> {
    let mut specs = config.initial_marginals.clone();
    specs.push(MarginalSpec::new(["srcip", "dstip"]));
    Ok(MarginalSet::new(specs))
}

/// Recoding that reports the sigma it was given.
pub fn echo_sigma(_: &FlowTable, sigma: f64) -> Result<f64, BoxError> {
    Ok(sigma)
}

/// Two epsilon, delta 1e-10, unit sensitivity, default ratios.
pub fn reference_config() -> SynthesisConfig {
    let mut config = SynthesisConfig::new(2.0).with_ratios(0.1, 0.1, 0.8);
    config.dataset_name = "ton_iot".to_string();
    config.delta = Some(1e-10);
    config.marg_add_sensitivity = 1.0;
    config
}
