//! Run Record - one invocation of a provisioned study function

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::logging::StudyLog;

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Directories are being created.
    Provisioning,
    /// The study function is executing.
    Running,
    /// The function returned and its metadata was written.
    Completed,
}

/// Run Record tracks one invocation from provisioning to metadata flush.
///
/// Runs are identified by their timestamp and live only on disk; nothing
/// keeps track of them between calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    study: String,
    timestamp: String,
    study_dir: PathBuf,
    run_dir: PathBuf,
    metadata_path: PathBuf,
    status: RunStatus,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    elapsed: Option<Duration>,
}

impl RunRecord {
    /// Create a run record in Provisioning status.
    #[must_use]
    pub fn new(
        study: impl Into<String>,
        timestamp: impl Into<String>,
        study_dir: impl Into<PathBuf>,
        metadata_file: &str,
    ) -> Self {
        let timestamp = timestamp.into();
        let study_dir = study_dir.into();
        let run_dir = study_dir.join(&timestamp);
        let metadata_path = run_dir.join(metadata_file);
        Self {
            study: study.into(),
            timestamp,
            study_dir,
            run_dir,
            metadata_path,
            status: RunStatus::Provisioning,
            started_at: None,
            ended_at: None,
            elapsed: None,
        }
    }

    /// Get the study name.
    #[must_use]
    pub fn study(&self) -> &str {
        &self.study
    }

    /// Get the run timestamp (also the run directory name).
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Get the study directory.
    #[must_use]
    pub fn study_dir(&self) -> &Path {
        &self.study_dir
    }

    /// Get the run directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Get the metadata file path.
    #[must_use]
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if the function has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended_at
    }

    /// Get the measured execution time of the study function.
    #[must_use]
    pub const fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Transition from Provisioning to Running.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Local::now());
    }

    /// Mark the run Completed with the measured function time.
    pub fn complete(&mut self, elapsed: Duration) {
        self.status = RunStatus::Completed;
        self.ended_at = Some(Local::now());
        self.elapsed = Some(elapsed);
    }
}

/// Everything a study function receives for one run.
///
/// `data_dir`, `results_dir` and `log` are the injected arguments; the
/// remaining fields describe where the run lives.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Caller-supplied data directory, or `<run_dir>/data`.
    pub data_dir: PathBuf,
    /// Caller-supplied results directory, or `<run_dir>/results`.
    pub results_dir: PathBuf,
    /// The study log.
    pub log: StudyLog,
    study_dir: PathBuf,
    run_dir: PathBuf,
    timestamp: String,
}

impl RunContext {
    pub(crate) fn new(
        record: &RunRecord,
        data_dir: PathBuf,
        results_dir: PathBuf,
        log: StudyLog,
    ) -> Self {
        Self {
            data_dir,
            results_dir,
            log,
            study_dir: record.study_dir().to_path_buf(),
            run_dir: record.run_dir().to_path_buf(),
            timestamp: record.timestamp().to_string(),
        }
    }

    /// Get the study directory.
    #[must_use]
    pub fn study_dir(&self) -> &Path {
        &self.study_dir
    }

    /// Get the run directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Get the run timestamp.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}
