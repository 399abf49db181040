//! # aipim: Experiment Run Bookkeeping
//!
//! Wrap a study function once; every call then gets its own timestamped run
//! directory, a shared study log, wall-clock timing, and a `metadata.json`
//! holding the numeric part of whatever the function returned.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/<study>/
//! ├── selected_data/          curated by hand, shared across runs
//! ├── selected_results/
//! ├── aipim.log               "<time> - <LEVEL> - <message>"
//! └── 2026-10-18_14-03-07/    one directory per run
//!     ├── data/
//!     ├── results/
//!     └── metadata.json
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use aipim::metadata::Record;
//! use aipim::study::{provision, RunArgs, RunContext};
//!
//! let train = provision("experiments")?.wrap("train", |ctx: RunContext| {
//!     ctx.log.info(format_args!("writing to {}", ctx.results_dir.display()));
//!     let loss = 0.042;
//!     Ok::<_, aipim::Error>(Record::new().with("loss", loss).with("model", "mlp"))
//! });
//!
//! train.call(RunArgs::new())?; // metadata.json: {"loss": 0.042}
//! # Ok::<(), aipim::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod format;
pub mod logging;
pub mod metadata;
pub mod paths;
pub mod study;

pub use error::{Error, Result};
pub use logging::{LogRegistry, StudyLog};
pub use metadata::{extract, MetadataDocument, Record, Value};
pub use study::{provision, Provisioner, RunArgs, RunContext, StudyConfig};
