//! Marginal specifications and their on-disk cache.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SynthError, SynthResult};
use crate::paths::DataPaths;

/// The attribute set of one low-dimensional marginal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarginalSpec(Vec<String>);

impl MarginalSpec {
    /// Create a marginal over the given attributes.
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(attributes.into_iter().map(Into::into).collect())
    }

    /// Attribute names, in order.
    pub fn attributes(&self) -> &[String] {
        &self.0
    }

    /// Number of attributes in the marginal.
    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

/// Marginals a run will publish.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarginalSet(Vec<MarginalSpec>);

impl MarginalSet {
    /// Create a set from marginal specs.
    pub fn new(specs: Vec<MarginalSpec>) -> Self {
        Self(specs)
    }

    /// Number of marginals.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `spec` is part of the set.
    pub fn contains(&self, spec: &MarginalSpec) -> bool {
        self.0.contains(spec)
    }

    /// Iterate over the marginals.
    pub fn iter(&self) -> std::slice::Iter<'_, MarginalSpec> {
        self.0.iter()
    }
}

impl FromIterator<MarginalSpec> for MarginalSet {
    fn from_iter<T: IntoIterator<Item = MarginalSpec>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Marginals seeded into every selection: port/protocol/flag combinations.
pub fn default_initial_marginals() -> Vec<MarginalSpec> {
    vec![
        MarginalSpec::new(["srcport", "proto", "flag"]),
        MarginalSpec::new(["dstport", "proto", "flag"]),
    ]
}

/// JSON file cache for a dataset's selected marginals.
///
/// Intended as the persistence half of a [`crate::DataStore`] implementation.
#[derive(Clone, Debug)]
pub struct MarginalCache {
    path: PathBuf,
}

impl MarginalCache {
    /// Cache stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache for `dataset_name` under the marginal directory of `paths`.
    pub fn for_dataset(paths: &DataPaths, dataset_name: &str) -> Self {
        Self::at(paths.marginal_dir().join(format!("{dataset_name}.json")))
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a cached set exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write `marginals`, creating parent directories as needed.
    pub fn save(&self, marginals: &MarginalSet) -> SynthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SynthError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(marginals)?;
        fs::write(&self.path, json).map_err(|source| SynthError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), count = marginals.len(), "marginals cached");
        Ok(())
    }

    /// Read a previously saved set.
    pub fn load(&self) -> SynthResult<MarginalSet> {
        let text = fs::read_to_string(&self.path).map_err(|source| SynthError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = MarginalCache::at(dir.path().join("nested").join("flows.json"));
        assert!(!cache.exists());

        let set = MarginalSet::new(default_initial_marginals());
        cache.save(&set).expect("save");
        assert!(cache.exists());
        assert_eq!(cache.load().expect("load"), set);
    }

    #[test]
    fn missing_cache_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = MarginalCache::at(dir.path().join("absent.json"));
        assert!(matches!(cache.load(), Err(SynthError::Io { .. })));
    }

    #[test]
    fn specs_serialize_as_plain_lists() {
        let spec = MarginalSpec::new(["srcip", "dstip"]);
        let json = serde_json::to_string(&spec).expect("json");
        assert_eq!(json, r#"["srcip","dstip"]"#);
        assert_eq!(spec.arity(), 2);
    }

    #[test]
    fn cache_path_follows_dataset_name() {
        let paths = DataPaths::rooted_at("/srv/netdpsyn");
        let cache = MarginalCache::for_dataset(&paths, "ton_iot");
        assert!(cache.path().ends_with("marginal/ton_iot.json"));
    }
}
