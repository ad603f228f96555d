use netdpsyn::core::BoxError;
use netdpsyn::{run, DataStore, Dataset, MarginalSet, SelectionConfig, SynthesisConfig};

struct Table;

impl Dataset for Table {
    fn num_records(&self) -> usize {
        50_000
    }

    fn num_attributes(&self) -> usize {
        8
    }

    fn domain_size(&self) -> f64 {
        1e12
    }
}

struct Store;

impl DataStore for Store {
    type Dataset = Table;

    fn load_processed_data(&self) -> Result<Table, BoxError> {
        Ok(Table)
    }

    fn save_marginal(&self, _marginals: &MarginalSet) -> Result<(), BoxError> {
        Ok(())
    }

    fn load_marginal(&self) -> Result<MarginalSet, BoxError> {
        Ok(MarginalSet::default())
    }
}

fn main() {
    let select = |_: &Table, cfg: &SelectionConfig| -> Result<MarginalSet, BoxError> {
        Ok(cfg.initial_marginals.iter().cloned().collect())
    };
    let recode = |_: &Table, sigma: f64| -> Result<f64, BoxError> { Ok(sigma) };

    let config = SynthesisConfig::new(2.0).with_ratios(0.2, 0.2, 0.2);
    let complete = run(config, Store, &select, &recode).expect("synthesis run");
    print!("{}", complete.audit().to_json_lines().expect("audit json"));
}
