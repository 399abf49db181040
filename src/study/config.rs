//! Study configuration and the explicit set of injectable run arguments.

use std::path::PathBuf;

use chrono::format::{self, Item, Parsed, StrftimeItems};
use chrono::Local;
use serde::{Deserialize, Serialize};

use super::Provisioner;
use crate::{Error, Result};

/// Names of everything the provisioner creates below a study directory.
///
/// ```text
/// <base_dir>/<study>/
/// ├── selected_data/
/// ├── selected_results/
/// ├── aipim.log
/// └── <timestamp>/
///     ├── data/
///     ├── results/
///     └── metadata.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyLayout {
    /// Manually curated data, shared by every run of the study.
    pub selected_data_dir: String,
    /// Manually curated results, shared by every run of the study.
    pub selected_results_dir: String,
    /// Study log file name.
    pub log_file: String,
    /// Per-run data directory, used when the caller supplies none.
    pub data_dir: String,
    /// Per-run results directory, used when the caller supplies none.
    pub results_dir: String,
    /// Per-run metadata file name.
    pub metadata_file: String,
    /// `strftime` pattern naming run directories.
    pub timestamp_format: String,
}

impl Default for StudyLayout {
    fn default() -> Self {
        Self {
            selected_data_dir: "selected_data".to_string(),
            selected_results_dir: "selected_results".to_string(),
            log_file: "aipim.log".to_string(),
            data_dir: "data".to_string(),
            results_dir: "results".to_string(),
            metadata_file: "metadata.json".to_string(),
            timestamp_format: "%Y-%m-%d_%H-%M-%S".to_string(),
        }
    }
}

impl StudyLayout {
    /// Reject layouts that cannot produce usable paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty name or an invalid
    /// timestamp pattern.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("selected_data_dir", &self.selected_data_dir),
            ("selected_results_dir", &self.selected_results_dir),
            ("log_file", &self.log_file),
            ("data_dir", &self.data_dir),
            ("results_dir", &self.results_dir),
            ("metadata_file", &self.metadata_file),
        ];
        if let Some((field, _)) = names.iter().find(|(_, value)| value.is_empty()) {
            return Err(Error::Configuration(format!("layout.{field} is empty")));
        }

        let pattern = &self.timestamp_format;
        if pattern.is_empty()
            || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
        {
            return Err(Error::Configuration(format!(
                "layout.timestamp_format '{pattern}' is not a valid strftime pattern"
            )));
        }
        if pattern.contains(['/', '\\']) {
            return Err(Error::Configuration(format!(
                "layout.timestamp_format '{pattern}' must not contain path separators"
            )));
        }

        let sample = Local::now().format(pattern).to_string();
        if sample == "." || sample == ".." || !self.is_run_name(&sample) {
            return Err(Error::Configuration(format!(
                "layout.timestamp_format '{pattern}' renders '{sample}', which does not read back as a run"
            )));
        }
        Ok(())
    }

    /// True if `name` is a directory name this layout gives to runs.
    ///
    /// Patterns without a time of day (`%Y-%m-%d`) are accepted as written.
    #[must_use]
    pub fn is_run_name(&self, name: &str) -> bool {
        let mut parsed = Parsed::new();
        format::parse(&mut parsed, name, StrftimeItems::new(&self.timestamp_format)).is_ok()
    }
}

/// Deserializable provisioner configuration.
///
/// ```rust
/// use aipim::study::StudyConfig;
///
/// let config = StudyConfig::from_json_str(r#"{"base_dir": "/tmp", "layout": {"log_file": "study.log"}}"#)?;
/// assert_eq!(config.layout.log_file, "study.log");
/// assert_eq!(config.layout.data_dir, "data");
/// # Ok::<(), aipim::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Directory under which one directory per study is created.
    pub base_dir: PathBuf,
    /// Directory and file names inside each study.
    #[serde(default)]
    pub layout: StudyLayout,
}

impl StudyConfig {
    /// Config with the default layout.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            layout: StudyLayout::default(),
        }
    }

    /// Build from untyped JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `base_dir` is missing or not a
    /// string, or if any other field has the wrong shape.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value.get("base_dir") {
            Some(serde_json::Value::String(_)) => {}
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "Expected a path string as base_dir, got {other}"
                )))
            }
            None => return Err(Error::Configuration("base_dir is missing".to_string())),
        }
        serde_json::from_value(value.clone()).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Build from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the text is not JSON or fails
    /// [`StudyConfig::from_json`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::Configuration(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Validate the base directory and layout, producing a provisioner.
    ///
    /// # Errors
    ///
    /// See [`ProvisionerBuilder::build`](super::ProvisionerBuilder::build).
    pub fn provision(self) -> Result<Provisioner> {
        Provisioner::builder(self.base_dir).layout(self.layout).build()
    }
}

/// Injectable arguments a caller may supply for one run.
///
/// `None` lets the provisioner derive the directory under the run directory.
/// Supplied paths are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Caller-chosen data directory.
    pub data_dir: Option<PathBuf>,
    /// Caller-chosen results directory.
    pub results_dir: Option<PathBuf>,
}

impl RunArgs {
    /// No caller-supplied arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` as the data directory.
    #[must_use]
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Use `path` as the results directory.
    #[must_use]
    pub fn results_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(path.into());
        self
    }
}
