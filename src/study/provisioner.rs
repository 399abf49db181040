//! Run provisioning: directories, log injection, timing and metadata flush.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;

use super::{RunArgs, RunContext, RunRecord, StudyLayout};
use crate::format::{format_execution_time, format_size};
use crate::logging::{LogRegistry, StudyLog};
use crate::metadata::{save_numeric_metadata, Record, Value};
use crate::paths::{check_path, dir_size, ensure_dir};
use crate::{Error, Result};

/// Validate `base_dir` and return a provisioner with the default layout and
/// a fresh log registry. An empty `base_dir` means the current directory.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if `base_dir` is not an existing directory.
pub fn provision(base_dir: impl Into<PathBuf>) -> Result<Provisioner> {
    Provisioner::builder(base_dir).build()
}

/// Creates one run directory per call of a study function.
///
/// The base directory is checked once, when the provisioner is built.
/// Calls into the same study are expected to happen one at a time: nothing
/// guards concurrent runs against each other's directories or log lines.
#[derive(Debug, Clone)]
pub struct Provisioner {
    base_dir: PathBuf,
    layout: StudyLayout,
    registry: LogRegistry,
}

/// Builder for `Provisioner`.
#[derive(Debug)]
pub struct ProvisionerBuilder {
    base_dir: PathBuf,
    layout: StudyLayout,
    registry: Option<LogRegistry>,
}

impl Default for ProvisionerBuilder {
    /// Builder rooted at the current directory.
    fn default() -> Self {
        Self::new(".")
    }
}

impl ProvisionerBuilder {
    /// Create a new builder with the required base directory.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            base_dir: if base_dir.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                base_dir
            },
            layout: StudyLayout::default(),
            registry: None,
        }
    }

    /// Use a custom study layout.
    #[must_use]
    pub fn layout(mut self, layout: StudyLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Share an existing log registry instead of starting an empty one.
    #[must_use]
    pub fn registry(mut self, registry: LogRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the `Provisioner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the base directory is unusable, and
    /// [`Error::Configuration`] for an invalid layout.
    pub fn build(self) -> Result<Provisioner> {
        check_path(&self.base_dir)?;
        self.layout.validate()?;
        Ok(Provisioner {
            base_dir: self.base_dir,
            layout: self.layout,
            registry: self.registry.unwrap_or_default(),
        })
    }
}

/// A finished run: the function's output plus its record.
#[derive(Debug, Clone)]
pub struct RunOutcome<R> {
    /// Whatever the study function returned.
    pub output: R,
    /// The completed run.
    pub record: RunRecord,
}

impl<R> RunOutcome<R> {
    /// Drop the record.
    pub fn into_output(self) -> R {
        self.output
    }
}

impl Provisioner {
    /// Create a builder for a provisioner rooted at `base_dir`.
    #[must_use]
    pub fn builder(base_dir: impl Into<PathBuf>) -> ProvisionerBuilder {
        ProvisionerBuilder::new(base_dir)
    }

    /// Get the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the study layout.
    #[must_use]
    pub const fn layout(&self) -> &StudyLayout {
        &self.layout
    }

    /// Get the log registry.
    #[must_use]
    pub const fn registry(&self) -> &LogRegistry {
        &self.registry
    }

    /// Directory of the study called `name`.
    #[must_use]
    pub fn study_dir(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Wrap `func` as the study `name`. Every call of the result is a new run.
    ///
    /// ```rust
    /// use aipim::study::{provision, RunArgs, RunContext};
    /// use aipim::metadata::Record;
    ///
    /// # fn main() -> aipim::Result<()> {
    /// let base = tempfile::tempdir()?;
    /// let train = provision(base.path())?.wrap("train", |ctx: RunContext| {
    ///     std::fs::write(ctx.results_dir.join("weights.bin"), [0u8; 16])?;
    ///     Ok::<_, aipim::Error>(Record::new().with("epochs", 3).with("model", "mlp"))
    /// });
    ///
    /// let outcome = train.call_recorded(RunArgs::new())?;
    /// assert!(outcome.record.metadata_path().is_file());
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn wrap<F>(&self, name: impl Into<String>, func: F) -> StudyFn<F> {
        StudyFn {
            name: name.into(),
            provisioner: self.clone(),
            func,
        }
    }

    /// Run `func` once as the study `name` and return its output.
    ///
    /// # Errors
    ///
    /// Provisioning and metadata errors are converted into `E`; errors from
    /// `func` are returned unchanged.
    pub fn run<F, R, E>(&self, name: &str, args: RunArgs, func: F) -> std::result::Result<R, E>
    where
        F: FnOnce(RunContext) -> std::result::Result<R, E>,
        R: Serialize,
        E: From<Error>,
    {
        self.run_recorded(name, args, func).map(RunOutcome::into_output)
    }

    /// Like [`Provisioner::run`], also returning the completed [`RunRecord`].
    ///
    /// # Errors
    ///
    /// See [`Provisioner::run`]. When `func` fails nothing further is logged
    /// and no metadata file is written.
    pub fn run_recorded<F, R, E>(
        &self,
        name: &str,
        args: RunArgs,
        func: F,
    ) -> std::result::Result<RunOutcome<R>, E>
    where
        F: FnOnce(RunContext) -> std::result::Result<R, E>,
        R: Serialize,
        E: From<Error>,
    {
        let (mut record, context) = self.prepare(name, args)?;
        let log = context.log.clone();

        record.start();
        let (output, elapsed) = match track_execution(name, record.study_dir(), &log, || {
            func(context)
        }) {
            Ok(done) => done,
            Err(e) => {
                tracing::debug!(study = name, run = record.timestamp(), "study function failed");
                return Err(e);
            }
        };

        let bindings = match Value::from_serialize(&output) {
            Value::Record(fields) => fields,
            _ => Record::new(),
        };
        save_numeric_metadata(&bindings, record.metadata_path())?;
        record.complete(elapsed);

        Ok(RunOutcome { output, record })
    }

    /// Timestamps of the study's existing runs, oldest first.
    ///
    /// Only directories whose name parses with the layout's timestamp
    /// pattern count as runs.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the study directory exists but cannot be read.
    pub fn list_runs(&self, name: &str) -> Result<Vec<String>> {
        let entries = match fs::read_dir(self.study_dir(name)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(dir_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.layout.is_run_name(&dir_name) {
                runs.push(dir_name);
            }
        }
        runs.sort();
        Ok(runs)
    }

    fn prepare(&self, name: &str, args: RunArgs) -> Result<(RunRecord, RunContext)> {
        validate_study_name(name)?;
        let layout = &self.layout;

        let timestamp = Local::now().format(&layout.timestamp_format).to_string();
        let study_dir = self.study_dir(name);
        let record = RunRecord::new(name, timestamp, &study_dir, &layout.metadata_file);

        ensure_dir(&study_dir.join(&layout.selected_data_dir))?;
        ensure_dir(&study_dir.join(&layout.selected_results_dir))?;

        let data_dir = match args.data_dir {
            Some(dir) => dir,
            None => {
                let dir = record.run_dir().join(&layout.data_dir);
                ensure_dir(&dir)?;
                dir
            }
        };
        let results_dir = match args.results_dir {
            Some(dir) => dir,
            None => {
                let dir = record.run_dir().join(&layout.results_dir);
                ensure_dir(&dir)?;
                dir
            }
        };

        let log = self
            .registry
            .get_or_create(name, &study_dir.join(&layout.log_file))?;

        tracing::debug!(
            study = name,
            run = record.timestamp(),
            run_dir = %record.run_dir().display(),
            "provisioned run"
        );

        let context = RunContext::new(&record, data_dir, results_dir, log);
        Ok((record, context))
    }
}

fn validate_study_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::Configuration(format!(
            "study name '{name}' must be a single directory name"
        ))),
    }
}

/// Run `func`, logging its start, its duration and the study's disk usage.
///
/// Nothing is logged after a failure; the error is returned as is.
///
/// # Errors
///
/// Returns whatever `func` returns.
pub fn track_execution<T, E>(
    name: &str,
    study_dir: &Path,
    log: &StudyLog,
    func: impl FnOnce() -> std::result::Result<T, E>,
) -> std::result::Result<(T, Duration), E> {
    log.info(format_args!("[aipim] Running '{name}'..."));

    let started = Instant::now();
    let output = func()?;
    let elapsed = started.elapsed();

    log.info(format_args!(
        "[aipim] '{name}' completed in {}.",
        format_execution_time(elapsed.as_secs_f64())
    ));
    log.info(format_args!(
        "[aipim] Total size of generated files: {}.",
        format_size(dir_size(study_dir))
    ));

    Ok((output, elapsed))
}

/// A study function bound to its provisioner.
pub struct StudyFn<F> {
    name: String,
    provisioner: Provisioner,
    func: F,
}

impl<F> StudyFn<F> {
    /// Get the study name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the provisioner.
    #[must_use]
    pub const fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// Start a new run and return the function's output unchanged.
    ///
    /// # Errors
    ///
    /// See [`Provisioner::run`].
    pub fn call<R, E>(&self, args: RunArgs) -> std::result::Result<R, E>
    where
        F: Fn(RunContext) -> std::result::Result<R, E>,
        R: Serialize,
        E: From<Error>,
    {
        self.provisioner.run(&self.name, args, &self.func)
    }

    /// Start a new run and return its output together with its record.
    ///
    /// # Errors
    ///
    /// See [`Provisioner::run`].
    pub fn call_recorded<R, E>(&self, args: RunArgs) -> std::result::Result<RunOutcome<R>, E>
    where
        F: Fn(RunContext) -> std::result::Result<R, E>,
        R: Serialize,
        E: From<Error>,
    {
        self.provisioner.run_recorded(&self.name, args, &self.func)
    }
}

impl<F> fmt::Debug for StudyFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyFn")
            .field("name", &self.name)
            .field("provisioner", &self.provisioner)
            .finish_non_exhaustive()
    }
}
