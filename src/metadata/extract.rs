//! Numeric projection of run bindings and the `metadata.json` document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::{Record, Value};
use crate::paths::ensure_dir;
use crate::Result;

/// Numeric-only projection of a run's bindings.
///
/// Every leaf is a JSON number; every branch holds at least one leaf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataDocument {
    entries: Map<String, serde_json::Value>,
}

impl MetadataDocument {
    /// Look up a top-level entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.entries.get(name)
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing numeric was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, serde_json::Value> {
        &self.entries
    }

    /// Render as two-space indented JSON, non-ASCII kept literal.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if rendering fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Write the document to `path`, creating parent directories and
    /// overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory or file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Read a document previously written with [`MetadataDocument::write`].
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a JSON error if it
    /// does not hold a JSON object.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Keep only numbers and records with numeric content, in input order.
///
/// Never fails: values without a numeric projection are dropped, and so is
/// any record that ends up empty.
///
/// ```rust
/// use aipim::metadata::{extract, Record};
///
/// let locals = Record::new().with("a", 1).with("b", "x").with("c", 2.5);
/// let doc = extract(&locals);
/// assert_eq!(doc.names().collect::<Vec<_>>(), ["a", "c"]);
/// ```
#[must_use]
pub fn extract(bindings: &Record) -> MetadataDocument {
    MetadataDocument {
        entries: project_record(bindings).unwrap_or_default(),
    }
}

fn project(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Number(n) => Some(serde_json::Value::Number(n.clone())),
        Value::Record(record) => project_record(record).map(serde_json::Value::Object),
        Value::Other => None,
    }
}

fn project_record(record: &Record) -> Option<Map<String, serde_json::Value>> {
    let fields: Map<String, serde_json::Value> = record
        .iter()
        .filter_map(|(name, value)| project(value).map(|numeric| (name.to_string(), numeric)))
        .collect();
    (!fields.is_empty()).then_some(fields)
}

/// Extract `bindings` and write the result to `path`.
///
/// # Errors
///
/// Returns an IO error if the document cannot be written.
pub fn save_numeric_metadata(bindings: &Record, path: &Path) -> Result<MetadataDocument> {
    let document = extract(bindings);
    document.write(path)?;
    tracing::debug!(
        path = %path.display(),
        entries = document.len(),
        "wrote numeric metadata"
    );
    Ok(document)
}
