//! Closed value model for run results: numbers, named records, everything else.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Number;

/// A run-result value as seen by the metadata extractor.
///
/// Mappings and structured records share the [`Value::Record`] variant.
/// Booleans, strings, sequences, null and non-finite floats are [`Value::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A JSON-representable number.
    Number(Number),
    /// Named fields, in insertion order.
    Record(Record),
    /// Anything without a numeric projection.
    Other,
}

impl Value {
    /// Convert any serializable value into the model.
    ///
    /// Serialization failures degrade to [`Value::Other`].
    #[must_use]
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Self::from_json(json),
            Err(e) => {
                tracing::warn!(error = %e, "value is not serializable, skipping it in metadata");
                Self::Other
            }
        }
    }

    /// Convert an already-built JSON value.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::Object(map) => Self::Record(
                map.into_iter()
                    .map(|(name, value)| (name, Self::from_json(value)))
                    .collect(),
            ),
            _ => Self::Other,
        }
    }

    /// True for [`Value::Number`].
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// The record, if this is one.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Self::Number(Number::from(n))
                }
            }
        )*
    };
}

number_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Other, Self::Number)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::from(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(_: bool) -> Self {
        Self::Other
    }
}

impl From<&str> for Value {
    fn from(_: &str) -> Self {
        Self::Other
    }
}

impl From<String> for Value {
    fn from(_: String) -> Self {
        Self::Other
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => n.serialize(serializer),
            Self::Record(record) => record.serialize(serializer),
            Self::Other => serializer.serialize_unit(),
        }
    }
}

/// Ordered name → value bindings.
///
/// Stands in for a function's local variables, or for the fields of a
/// structured record. Re-inserting a name replaces its value in place.
///
/// ```rust
/// use aipim::metadata::Record;
///
/// let locals = Record::new()
///     .with("epochs", 10)
///     .with("model", "resnet")
///     .with("optimizer", Record::new().with("lr", 0.01));
/// assert_eq!(locals.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind `name` to `value`, keeping the original position if `name` exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Field order is part of equality.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
