//! Run configuration for the synthesis pipeline.
//!
//! [`SynthesisConfig`] is deserialized from TOML or JSON and validated before a
//! run starts. Only structural checks happen here; privacy-parameter checks are
//! left to the accounting layer so a bad epsilon fails in the stage that uses it.
//!
//! # Example
//!
//! ```rust
//! use netdpsyn::SynthesisConfig;
//!
//! let cfg = SynthesisConfig::from_toml_str("epsilon = 2.0\ndataset_name = \"ton_iot\"")
//!     .expect("valid config");
//! assert_eq!(cfg.publish_rho_ratio, 0.8);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use netdpsyn_accounting::{
    delta_for_records, CompositionAccountant, PrivacyParameters, StageRatios, ZcdpConversion,
};
use netdpsyn_core::Result as DpResult;

use crate::error::ConfigError;
use crate::marginal::{default_initial_marginals, MarginalSpec};
use crate::paths::DataPaths;

/// Default marginal-selection threshold.
pub const DEFAULT_SELECTION_THRESHOLD: u64 = 5000;

fn default_dataset_name() -> String {
    "flows".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sensitivity() -> f64 {
    1.0
}

fn default_binning_ratio() -> f64 {
    0.1
}

fn default_selection_ratio() -> f64 {
    0.1
}

fn default_publish_ratio() -> f64 {
    0.8
}

fn default_num_compositions() -> u64 {
    1
}

fn default_threshold() -> u64 {
    DEFAULT_SELECTION_THRESHOLD
}

/// Everything a synthesis run needs besides the dataset itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Target epsilon for the whole run.
    pub epsilon: f64,

    /// Dataset name; keys the marginal cache.
    #[serde(default = "default_dataset_name")]
    pub dataset_name: String,

    /// Select marginals (`true`) or load them from the cache (`false`).
    #[serde(default = "default_true")]
    pub is_cal_marginals: bool,

    /// L2 sensitivity of one marginal addition.
    #[serde(default = "default_sensitivity")]
    pub marg_add_sensitivity: f64,

    /// Share of rho for binning/recoding.
    #[serde(default = "default_binning_ratio")]
    pub binning_rho_ratio: f64,

    /// Share of rho for marginal selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_rho_ratio: Option<f64>,

    /// Legacy name for `selection_rho_ratio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depend_epsilon_ratio: Option<f64>,

    /// Share of rho for publishing marginals.
    #[serde(default = "default_publish_ratio")]
    pub publish_rho_ratio: f64,

    /// Explicit delta. When absent, `1/n²` for the loaded record count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,

    /// Number of Gaussian compositions the total rho accounts for.
    #[serde(default = "default_num_compositions")]
    pub num_compositions: u64,

    /// (epsilon, delta) to rho conversion.
    #[serde(default)]
    pub conversion: ZcdpConversion,

    /// Domain-size threshold handed to marginal selection.
    #[serde(default = "default_threshold")]
    pub selection_threshold: u64,

    /// Marginals every selection starts from.
    #[serde(default = "default_initial_marginals")]
    pub initial_marginals: Vec<MarginalSpec>,

    /// On-disk layout.
    #[serde(default)]
    pub paths: DataPaths,
}

/// Non-fatal findings from [`SynthesisConfig::validate`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConfigWarning {
    /// Only `depend_epsilon_ratio` was given; it is used as the selection ratio.
    LegacySelectionAlias {
        /// The aliased value.
        value: f64,
    },
    /// Both names were given; `selection_rho_ratio` wins.
    LegacySelectionAliasIgnored {
        /// Value of `selection_rho_ratio`.
        selection_rho_ratio: f64,
        /// Ignored value of `depend_epsilon_ratio`.
        depend_epsilon_ratio: f64,
    },
    /// Ratios do not sum to one and will be rescaled.
    RatiosNotNormalized {
        /// Their sum.
        sum: f64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::LegacySelectionAlias { value } => write!(
                f,
                "`depend_epsilon_ratio` is deprecated; using {value} as `selection_rho_ratio`"
            ),
            ConfigWarning::LegacySelectionAliasIgnored {
                selection_rho_ratio,
                depend_epsilon_ratio,
            } => write!(
                f,
                "`depend_epsilon_ratio` = {depend_epsilon_ratio} ignored in favour of \
                 `selection_rho_ratio` = {selection_rho_ratio}"
            ),
            ConfigWarning::RatiosNotNormalized { sum } => {
                write!(f, "stage ratios sum to {sum}; they will be normalized")
            }
        }
    }
}

impl SynthesisConfig {
    /// Default configuration for the given epsilon.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            dataset_name: default_dataset_name(),
            is_cal_marginals: true,
            marg_add_sensitivity: default_sensitivity(),
            binning_rho_ratio: default_binning_ratio(),
            selection_rho_ratio: None,
            depend_epsilon_ratio: None,
            publish_rho_ratio: default_publish_ratio(),
            delta: None,
            num_compositions: default_num_compositions(),
            conversion: ZcdpConversion::default(),
            selection_threshold: DEFAULT_SELECTION_THRESHOLD,
            initial_marginals: default_initial_marginals(),
            paths: DataPaths::default(),
        }
    }

    /// Set the stage ratios.
    pub fn with_ratios(mut self, binning: f64, selection: f64, publish: f64) -> Self {
        self.binning_rho_ratio = binning;
        self.selection_rho_ratio = Some(selection);
        self.depend_epsilon_ratio = None;
        self.publish_rho_ratio = publish;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "toml",
            msg: e.to_string(),
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            format: "json",
            msg: e.to_string(),
        })
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => "toml",
            Some("json") => "json",
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if format == "toml" {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Check structural fields and report non-fatal findings.
    ///
    /// Every warning is also logged at warn level.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        if self.dataset_name.trim().is_empty() {
            return Err(ConfigError::invalid_value("dataset_name", "must not be empty"));
        }
        if self.num_compositions == 0 {
            return Err(ConfigError::invalid_value("num_compositions", "must be >= 1"));
        }
        if self.initial_marginals.iter().any(|m| m.arity() == 0) {
            return Err(ConfigError::invalid_value(
                "initial_marginals",
                "marginals must name at least one attribute",
            ));
        }

        let mut warnings = Vec::new();
        match (self.selection_rho_ratio, self.depend_epsilon_ratio) {
            (None, Some(value)) => {
                warnings.push(ConfigWarning::LegacySelectionAlias { value });
            }
            (Some(selection_rho_ratio), Some(depend_epsilon_ratio)) => {
                warnings.push(ConfigWarning::LegacySelectionAliasIgnored {
                    selection_rho_ratio,
                    depend_epsilon_ratio,
                });
            }
            _ => {}
        }

        let ratios = self.resolve_ratios();
        if ratios.sum().is_finite() && !ratios.is_normalized() {
            warnings.push(ConfigWarning::RatiosNotNormalized { sum: ratios.sum() });
        }

        for warning in &warnings {
            warn!(dataset = %self.dataset_name, "{warning}");
        }
        Ok(warnings)
    }

    /// Stage ratios with the legacy alias resolved.
    pub fn resolve_ratios(&self) -> StageRatios {
        let selection = self
            .selection_rho_ratio
            .or(self.depend_epsilon_ratio)
            .unwrap_or_else(default_selection_ratio);
        StageRatios::new(self.binning_rho_ratio, selection, self.publish_rho_ratio)
    }

    /// Delta for a dataset of `num_records` rows.
    pub fn resolve_delta(&self, num_records: usize) -> DpResult<f64> {
        match self.delta {
            Some(delta) => Ok(delta),
            None => delta_for_records(num_records),
        }
    }

    /// Validated privacy parameters for a dataset of `num_records` rows.
    pub fn privacy_parameters(&self, num_records: usize) -> DpResult<PrivacyParameters> {
        let delta = self.resolve_delta(num_records)?;
        PrivacyParameters::new(self.epsilon, delta, self.marg_add_sensitivity)
    }

    /// Accountant using the configured conversion.
    pub fn accountant(&self) -> CompositionAccountant {
        CompositionAccountant::new(self.conversion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_gets_defaults() {
        let cfg = SynthesisConfig::from_toml_str("epsilon = 2.0").expect("parse");
        assert_eq!(cfg, SynthesisConfig::new(2.0));
        assert_eq!(cfg.resolve_ratios(), StageRatios::default());
        assert_eq!(cfg.selection_threshold, 5000);
        assert!(cfg.validate().expect("valid").is_empty());
    }

    #[test]
    fn missing_epsilon_is_a_parse_error() {
        let err = SynthesisConfig::from_toml_str("dataset_name = \"x\"").expect_err("no epsilon");
        assert!(matches!(err, ConfigError::Parse { format: "toml", .. }));
    }

    #[test]
    fn legacy_alias_alone_is_used_and_flagged() {
        let cfg = SynthesisConfig::from_json_str(
            r#"{"epsilon": 1.0, "depend_epsilon_ratio": 0.3, "publish_rho_ratio": 0.6}"#,
        )
        .expect("parse");
        assert_eq!(cfg.resolve_ratios().selection, 0.3);
        let warnings = cfg.validate().expect("valid");
        assert_eq!(
            warnings,
            vec![ConfigWarning::LegacySelectionAlias { value: 0.3 }]
        );
    }

    #[test]
    fn canonical_name_beats_legacy_alias() {
        let cfg = SynthesisConfig::from_toml_str(
            "epsilon = 1.0\nselection_rho_ratio = 0.1\ndepend_epsilon_ratio = 0.5",
        )
        .expect("parse");
        assert_eq!(cfg.resolve_ratios().selection, 0.1);
        let warnings = cfg.validate().expect("valid");
        assert_eq!(
            warnings,
            vec![ConfigWarning::LegacySelectionAliasIgnored {
                selection_rho_ratio: 0.1,
                depend_epsilon_ratio: 0.5,
            }]
        );
    }

    #[test]
    fn unnormalized_ratios_are_reported() {
        let cfg = SynthesisConfig::new(1.0).with_ratios(0.2, 0.2, 0.2);
        let warnings = cfg.validate().expect("valid");
        assert!(matches!(
            warnings.as_slice(),
            [ConfigWarning::RatiosNotNormalized { sum }] if (sum - 0.6).abs() < 1e-12
        ));
    }

    #[test]
    fn structural_errors_name_the_field() {
        let mut cfg = SynthesisConfig::new(1.0);
        cfg.num_compositions = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "num_compositions", .. })
        ));

        let mut cfg = SynthesisConfig::new(1.0);
        cfg.dataset_name = " ".into();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "dataset_name", .. })
        ));
    }

    #[test]
    fn delta_defaults_to_inverse_square_of_records() {
        let cfg = SynthesisConfig::new(1.0);
        assert_eq!(cfg.resolve_delta(1000).expect("delta"), 1e-6);

        let mut cfg = SynthesisConfig::new(1.0);
        cfg.delta = Some(1e-10);
        assert_eq!(cfg.privacy_parameters(10).expect("params").delta(), 1e-10);
    }

    #[test]
    fn conversion_parses_snake_case() {
        let cfg =
            SynthesisConfig::from_toml_str("epsilon = 1.0\nconversion = \"analytic_gaussian\"")
                .expect("parse");
        assert_eq!(cfg.accountant().conversion(), ZcdpConversion::AnalyticGaussian);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = SynthesisConfig::from_path(Path::new("run.yaml")).expect_err("yaml");
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }
}
