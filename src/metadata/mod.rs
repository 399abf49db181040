//! Metadata extraction
//!
//! A run's result is flattened into the closed [`Value`] model and projected
//! down to its numeric content, which is persisted as `metadata.json`.
//!
//! ```text
//! run result ──serialize──> Value::{Number | Record | Other}
//!                                │
//!                             extract      (drop Other, prune empty records)
//!                                │
//!                         MetadataDocument ──write──> <run_dir>/metadata.json
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use aipim::metadata::{extract, Record, Value};
//!
//! #[derive(serde::Serialize)]
//! struct Optimizer {
//!     name: String,
//!     lr: f64,
//! }
//!
//! let locals = Record::new()
//!     .with("loss", 0.25)
//!     .with("label", "baseline")
//!     .with("optimizer", Value::from_serialize(&Optimizer { name: "adam".into(), lr: 0.001 }));
//!
//! let doc = extract(&locals);
//! assert_eq!(doc.names().collect::<Vec<_>>(), ["loss", "optimizer"]);
//! ```

mod extract;
mod value;

pub use extract::{extract, save_numeric_metadata, MetadataDocument};
pub use value::{Record, Value};
