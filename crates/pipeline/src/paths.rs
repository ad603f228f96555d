//! On-disk layout of a synthesis project.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SynthError, SynthResult};

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_temp_data() -> PathBuf {
    PathBuf::from("lib_preprocess/temp_data")
}

fn default_field_types() -> PathBuf {
    PathBuf::from("fields.json")
}

/// Directory layout rooted at a project directory.
///
/// ```text
/// <root>/
/// ├── fields.json
/// └── lib_preprocess/temp_data/
///     ├── raw_data/
///     ├── processed_data/
///     ├── synthesized_records/
///     ├── marginal/
///     └── dependency/
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    /// Project root.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Working-data directory, relative to `root` unless absolute.
    #[serde(default = "default_temp_data")]
    pub temp_data: PathBuf,
    /// Field-type description file, relative to `root` unless absolute.
    #[serde(default = "default_field_types")]
    pub field_types: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            root: default_root(),
            temp_data: default_temp_data(),
            field_types: default_field_types(),
        }
    }
}

impl DataPaths {
    /// Default layout under `root`.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    fn temp_dir(&self) -> PathBuf {
        self.root.join(&self.temp_data)
    }

    /// Raw captures and flow exports.
    pub fn raw_data_dir(&self) -> PathBuf {
        self.temp_dir().join("raw_data")
    }

    /// Preprocessed tabular datasets.
    pub fn processed_data_dir(&self) -> PathBuf {
        self.temp_dir().join("processed_data")
    }

    /// Synthesized output records.
    pub fn synthesized_records_dir(&self) -> PathBuf {
        self.temp_dir().join("synthesized_records")
    }

    /// Cached marginals.
    pub fn marginal_dir(&self) -> PathBuf {
        self.temp_dir().join("marginal")
    }

    /// Cached attribute dependencies.
    pub fn dependency_dir(&self) -> PathBuf {
        self.temp_dir().join("dependency")
    }

    /// Field-type description file.
    pub fn field_types_path(&self) -> PathBuf {
        self.root.join(&self.field_types)
    }

    /// Every working directory, in creation order.
    pub fn all_dirs(&self) -> [PathBuf; 5] {
        [
            self.raw_data_dir(),
            self.processed_data_dir(),
            self.synthesized_records_dir(),
            self.marginal_dir(),
            self.dependency_dir(),
        ]
    }

    /// Create every working directory that does not exist yet.
    pub fn ensure_all(&self) -> SynthResult<()> {
        for dir in self.all_dirs() {
            create_dir(&dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> SynthResult<()> {
    fs::create_dir_all(dir).map_err(|source| SynthError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
