//! Studies and runs
//!
//! A study groups every run of one function under `<base_dir>/<study>/`.
//! Each call of a wrapped function is one run:
//!
//! ```text
//! provisioning ──> running ──> metadata flush ──> output returned
//!   dirs, log        timed        metadata.json
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use aipim::study::{provision, RunArgs, RunContext};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Summary {
//!     accuracy: f64,
//!     epochs: u32,
//!     notes: String,
//! }
//!
//! # fn main() -> aipim::Result<()> {
//! let base = tempfile::tempdir()?;
//! let provisioner = provision(base.path())?;
//!
//! let train = provisioner.wrap("train", |ctx: RunContext| {
//!     ctx.log.info("training");
//!     Ok::<_, aipim::Error>(Summary { accuracy: 0.93, epochs: 5, notes: "ok".into() })
//! });
//!
//! let summary = train.call(RunArgs::new())?;
//! assert_eq!(summary.epochs, 5);
//! assert_eq!(provisioner.list_runs("train")?.len(), 1);
//! # Ok(())
//! # }
//! ```

mod config;
mod provisioner;
mod run_record;

pub use config::{RunArgs, StudyConfig, StudyLayout};
pub use provisioner::{
    provision, track_execution, Provisioner, ProvisionerBuilder, RunOutcome, StudyFn,
};
pub use run_record::{RunContext, RunRecord, RunStatus};
