//! `netdpsyn` binary: plans the privacy budget of a synthesis run.
//!
//! # Usage
//!
//! ```bash
//! netdpsyn --config run.toml --num-records 100000 --num-attributes 11
//! netdpsyn --config run.toml --num-records 100000 --num-attributes 11 --audit-out audit.jsonl
//! ```
//!
//! The run is dry: the dataset is described only by its shape, selection
//! returns the configured initial marginals and recoding is skipped. The budget
//! numbers are exactly those a real run with the same shape would use.
//!
//! Nothing is written besides `--audit-out` unless `--write-cache` is given, in
//! which case the selected marginals go to
//! `<paths.root>/<paths.temp_data>/marginal/<dataset_name>.json`. Runs with
//! `is_cal_marginals = false` read that file.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use netdpsyn::core::BoxError;
use netdpsyn::{
    DataStore, Dataset, MarginalCache, MarginalSet, PrivacyBudget, SelectionConfig,
    SigmaAllocation, SynthError, SynthesisConfig,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "netdpsyn",
    version,
    about = "Privacy-budget planning for differentially private network-flow synthesis",
    long_about = None
)]
struct Args {
    /// Path to the TOML or JSON run configuration.
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Number of records in the processed dataset.
    #[arg(long)]
    num_records: usize,

    /// Number of attributes in the processed dataset.
    #[arg(long)]
    num_attributes: usize,

    /// Joint domain size of the dataset, for logging.
    #[arg(long, default_value_t = 0.0)]
    domain_size: f64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the audit trail as JSON lines to this file.
    #[arg(long, value_name = "FILE")]
    audit_out: Option<PathBuf>,

    /// Persist the selected marginals to the marginal cache.
    #[arg(long, default_value_t = false)]
    write_cache: bool,
}

/// A dataset known only by its shape.
struct Shape {
    num_records: usize,
    num_attributes: usize,
    domain_size: f64,
}

impl Dataset for Shape {
    fn num_records(&self) -> usize {
        self.num_records
    }

    fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    fn domain_size(&self) -> f64 {
        self.domain_size
    }
}

struct ShapeStore {
    num_records: usize,
    num_attributes: usize,
    domain_size: f64,
    cache: MarginalCache,
    write_cache: bool,
}

impl DataStore for ShapeStore {
    type Dataset = Shape;

    fn load_processed_data(&self) -> Result<Shape, BoxError> {
        Ok(Shape {
            num_records: self.num_records,
            num_attributes: self.num_attributes,
            domain_size: self.domain_size,
        })
    }

    fn save_marginal(&self, marginals: &MarginalSet) -> Result<(), BoxError> {
        if !self.write_cache {
            return Ok(());
        }
        self.cache.save(marginals).map_err(Into::into)
    }

    fn load_marginal(&self) -> Result<MarginalSet, BoxError> {
        self.cache.load().map_err(Into::into)
    }
}

fn initial_marginals(_: &Shape, config: &SelectionConfig) -> Result<MarginalSet, BoxError> {
    Ok(config.initial_marginals.iter().cloned().collect())
}

fn skip_recoding(_: &Shape, _: f64) -> Result<(), BoxError> {
    Ok(())
}

#[derive(Serialize)]
struct Summary<'a> {
    dataset_name: &'a str,
    budget: &'a PrivacyBudget,
    binning: &'a SigmaAllocation,
    depend_epsilon: f64,
    remain_epsilon: f64,
    marginals: &'a MarginalSet,
}

fn execute(args: &Args) -> Result<(), SynthError> {
    info!("netdpsyn v{}", netdpsyn::VERSION);
    info!("Loading configuration from {}", args.config.display());
    let config = SynthesisConfig::from_path(&args.config)?;

    let store = ShapeStore {
        num_records: args.num_records,
        num_attributes: args.num_attributes,
        domain_size: args.domain_size,
        cache: MarginalCache::for_dataset(&config.paths, &config.dataset_name),
        write_cache: args.write_cache,
    };
    let complete = netdpsyn::run(config, store, &initial_marginals, &skip_recoding)?;

    let summary = Summary {
        dataset_name: &complete.config().dataset_name,
        budget: complete.budget(),
        binning: complete.binning(),
        depend_epsilon: complete.budget().depend_epsilon(),
        remain_epsilon: complete.budget().remain_epsilon(),
        marginals: complete.marginals(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = &args.audit_out {
        let lines = complete.audit().to_json_lines()?;
        std::fs::write(path, lines).map_err(|source| SynthError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Audit trail written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &std::path::Path, write_cache: bool) -> ShapeStore {
        ShapeStore {
            num_records: 1_000,
            num_attributes: 8,
            domain_size: 0.0,
            cache: MarginalCache::at(dir.join("marginal").join("flows.json")),
            write_cache,
        }
    }

    fn config(dir: &std::path::Path) -> SynthesisConfig {
        let mut config = SynthesisConfig::new(2.0);
        config.paths = netdpsyn::DataPaths::rooted_at(dir);
        config
    }

    #[test]
    fn dry_run_leaves_no_files_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let complete = netdpsyn::run(
            config(dir.path()),
            store(dir.path(), false),
            &initial_marginals,
            &skip_recoding,
        )
        .expect("run");
        assert!(!complete.store().cache.exists());
        let entries = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn write_cache_persists_selected_marginals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let complete = netdpsyn::run(
            config(dir.path()),
            store(dir.path(), true),
            &initial_marginals,
            &skip_recoding,
        )
        .expect("run");
        let cached = complete.store().cache.load().expect("cached marginals");
        assert_eq!(&cached, complete.marginals());
    }
}
