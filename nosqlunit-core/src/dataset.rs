//! Test descriptions and dataset lookup.
//!
//! A [`TestCase`] names the running test and optionally carries a
//! [`UsingDataSet`] (what to load before the test) and a
//! [`ShouldMatchDataSet`] (what the store must hold afterwards). When no
//! explicit location is given, datasets are looked up by convention:
//!
//! - `<Class>#<method>.<ext>`, then `<Class>.<ext>` for initial data
//! - `<Class>#<method>-expected.<ext>`, then `<Class>-expected.<ext>` for
//!   expected data

use crate::error::{NoSqlUnitError, Result};
use crate::strategy::LoadStrategy;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXPECTED_SUFFIX: &str = "-expected";

/// Directory datasets are resolved against by default, relative to the
/// crate under test.
pub const DEFAULT_DATASET_DIR: &str = "tests/datasets";

/// Locations bound to one connection identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectiveLocation {
    identifier: String,
    locations: Vec<String>,
}

impl SelectiveLocation {
    /// Connection identifier the locations apply to.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Dataset locations.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

/// Initial data for a test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsingDataSet {
    locations: Vec<String>,
    selective: Vec<SelectiveLocation>,
    strategy: LoadStrategy,
}

impl UsingDataSet {
    /// Use the conventional dataset with the default strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an explicit dataset location.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    /// Add locations that only apply to the rule with the given identifier.
    pub fn selective<I, S>(mut self, identifier: impl Into<String>, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selective.push(SelectiveLocation {
            identifier: identifier.into(),
            locations: locations.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set the load strategy.
    pub fn strategy(mut self, strategy: LoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The load strategy.
    pub fn load_strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Explicit locations for a rule: the shared ones plus those selected
    /// for `identifier`. Empty means "use the convention".
    pub fn locations_for(&self, identifier: &str) -> Vec<&str> {
        self.locations
            .iter()
            .map(String::as_str)
            .chain(
                self.selective
                    .iter()
                    .filter(|s| s.identifier == identifier)
                    .flat_map(|s| s.locations.iter().map(String::as_str)),
            )
            .collect()
    }
}

/// Expected data after a test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShouldMatchDataSet {
    location: Option<String>,
    selective: Vec<(String, String)>,
}

impl ShouldMatchDataSet {
    /// Compare against the conventional expected dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against an explicit location.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Use a location only for the rule with the given identifier.
    pub fn selective(mut self, identifier: impl Into<String>, location: impl Into<String>) -> Self {
        self.selective.push((identifier.into(), location.into()));
        self
    }

    /// Explicit location for a rule, selective entries first.
    pub fn location_for(&self, identifier: &str) -> Option<&str> {
        self.selective
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, location)| location.as_str())
            .or(self.location.as_deref())
    }
}

/// Description of the test a rule runs around.
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    class: Option<String>,
    method: String,
    using: Option<UsingDataSet>,
    should_match: Option<ShouldMatchDataSet>,
}

impl TestCase {
    /// Describe a test method of a named test class.
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            method: method.into(),
            ..Self::default()
        }
    }

    /// Describe a test method; the class comes from the rule's unit instance.
    pub fn method(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Attach initial data.
    pub fn using_data_set(mut self, using: UsingDataSet) -> Self {
        self.using = Some(using);
        self
    }

    /// Attach expected data.
    pub fn should_match_data_set(mut self, expected: ShouldMatchDataSet) -> Self {
        self.should_match = Some(expected);
        self
    }

    /// Test class name, if known.
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Test method name.
    pub fn method_name(&self) -> &str {
        &self.method
    }

    /// Initial data, if any.
    pub fn initial_data(&self) -> Option<&UsingDataSet> {
        self.using.as_ref()
    }

    /// Expected data, if any.
    pub fn expected_data(&self) -> Option<&ShouldMatchDataSet> {
        self.should_match.as_ref()
    }
}

/// Resolves dataset locations to files under a root directory.
#[derive(Debug, Clone)]
pub struct DataSetLocator {
    root: PathBuf,
    extension: String,
}

impl DataSetLocator {
    /// Create a locator for files with the given extension.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Locator rooted at `tests/datasets` of the crate being tested.
    pub fn default_root(extension: impl Into<String>) -> Self {
        let base = std::env::var_os("CARGO_MANIFEST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(DEFAULT_DATASET_DIR), extension)
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working file extension.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve explicit locations; every one of them must exist.
    pub fn resolve(&self, locations: &[&str]) -> Result<Vec<PathBuf>> {
        locations
            .iter()
            .map(|location| {
                let path = self.root.join(location);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(NoSqlUnitError::DataSetNotFound { tried: vec![path] })
                }
            })
            .collect()
    }

    /// Conventional initial dataset for a test.
    pub fn initial(&self, class: &str, method: &str) -> Result<PathBuf> {
        self.conventional(class, method, "")
    }

    /// Conventional expected dataset for a test.
    pub fn expected(&self, class: &str, method: &str) -> Result<PathBuf> {
        self.conventional(class, method, EXPECTED_SUFFIX)
    }

    fn conventional(&self, class: &str, method: &str, suffix: &str) -> Result<PathBuf> {
        let candidates = [
            self.root
                .join(format!("{}#{}{}.{}", class, method, suffix, self.extension)),
            self.root.join(format!("{}{}.{}", class, suffix, self.extension)),
        ];

        for candidate in &candidates {
            if candidate.is_file() {
                debug!("Using dataset {}", candidate.display());
                return Ok(candidate.clone());
            }
        }

        Err(NoSqlUnitError::DataSetNotFound {
            tried: candidates.to_vec(),
        })
    }

    /// Read a dataset file.
    pub async fn read(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| NoSqlUnitError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}
