//! Error types for configuration loading and pipeline runs.
//!
//! ```text
//! SynthError
//! ├── Config  (file loading / parsing / invalid values)
//! ├── Stage   (a DpError raised while executing a named stage)
//! ├── Io      (marginal cache and data-path I/O)
//! └── Json    (audit and cache serialization)
//! ```

use std::path::PathBuf;

use thiserror::Error;

use netdpsyn_core::{DpError, DpErrorKind, Stage};

/// Result alias for pipeline-level operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Top-level error for a synthesis run.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline stage failed; the run was aborted.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The stage that failed.
        stage: Stage,
        /// The underlying accounting or collaborator error.
        #[source]
        source: DpError,
    },

    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SynthError {
    /// Build a closure tagging a [`DpError`] with the stage it came from.
    pub fn at(stage: Stage) -> impl FnOnce(DpError) -> Self {
        move |source| SynthError::Stage { stage, source }
    }

    /// The stage that failed, for stage errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SynthError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The documented accounting error kind, for stage errors.
    pub fn dp_kind(&self) -> Option<DpErrorKind> {
        match self {
            SynthError::Stage { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Errors raised while loading or validating a [`crate::SynthesisConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text could not be parsed.
    #[error("cannot parse {format} config: {msg}")]
    Parse {
        /// `toml` or `json`.
        format: &'static str,
        /// Parser message.
        msg: String,
    },

    /// The file extension is neither `.toml` nor `.json`.
    #[error("unsupported config format for {path} (expected .toml or .json)")]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },

    /// A field holds a value the pipeline cannot use.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Construct an [`ConfigError::InvalidValue`].
    pub fn invalid_value<R: Into<String>>(field: &'static str, reason: R) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
