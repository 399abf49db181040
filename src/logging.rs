//! Study logs and the registry that memoizes them.
//!
//! Each study writes an append-only text log, one line per event:
//!
//! ```text
//! 2026-10-18 14:03:07,512 - INFO - [aipim] Running 'train'...
//! ```
//!
//! A [`StudyLog`] owns its own `tracing` dispatcher, so study logs never touch
//! (or depend on) the process-wide subscriber. Handles are cached per study
//! name in a [`LogRegistry`], which is passed to the provisioner explicitly.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use dashmap::DashMap;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::paths::ensure_dir;
use crate::{Error, Result};

const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// `<timestamp> - <LEVEL> - <message>`
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - ",
            Local::now().format(LINE_TIMESTAMP_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Handle to one study's log file.
///
/// Cheap to clone; clones write to the same file.
#[derive(Clone)]
pub struct StudyLog {
    name: Arc<str>,
    path: Arc<Path>,
    dispatch: Dispatch,
}

impl StudyLog {
    /// Open (or create) `path` in append mode and log INFO and above to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Logging`] if the file cannot be opened.
    pub fn open(name: &str, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::Logging(format!("cannot open {}: {e}", path.display())))?;

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .event_format(LineFormat)
            .with_writer(Mutex::new(file))
            .finish();

        tracing::debug!(study = name, path = %path.display(), "opened study log");

        Ok(Self {
            name: Arc::from(name),
            path: Arc::from(path),
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Study name this log belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an INFO line.
    pub fn info(&self, message: impl fmt::Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::info!("{message}"));
    }

    /// Write a WARN line.
    pub fn warn(&self, message: impl fmt::Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::warn!("{message}"));
    }

    /// Write an ERROR line.
    pub fn error(&self, message: impl fmt::Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::error!("{message}"));
    }
}

impl fmt::Debug for StudyLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyLog")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Name-keyed cache of study logs.
///
/// The first request for a name opens the log; later requests for the same
/// name return that handle, whatever path they ask for. Clones share the
/// same cache.
///
/// # Example
///
/// ```rust
/// use aipim::logging::LogRegistry;
///
/// # fn main() -> aipim::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let registry = LogRegistry::new();
/// let first = registry.get_or_create("train", &dir.path().join("a.log"))?;
/// let again = registry.get_or_create("train", &dir.path().join("b.log"))?;
/// assert_eq!(first.path(), again.path());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogRegistry {
    logs: Arc<DashMap<String, StudyLog>>,
}

impl LogRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the log registered under `name`, opening `path` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Logging`] if a new log file cannot be opened.
    pub fn get_or_create(&self, name: &str, path: &Path) -> Result<StudyLog> {
        if let Some(log) = self.logs.get(name) {
            return Ok(log.value().clone());
        }
        let log = self
            .logs
            .entry(name.to_string())
            .or_try_insert_with(|| StudyLog::open(name, path))?;
        Ok(log.value().clone())
    }

    /// The log registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<StudyLog> {
        self.logs.get(name).map(|log| log.value().clone())
    }

    /// Number of registered logs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// True if no log has been opened yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Log file paths of every registered study, in no particular order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.logs
            .iter()
            .map(|entry| entry.value().path().to_path_buf())
            .collect()
    }
}
