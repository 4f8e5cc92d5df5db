//! Caller-declared type overrides.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::types::{DataType, Value};

/// Boxed error returned by custom converters and source adapters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type ConvertFn = dyn Fn(&str) -> Result<Value, BoxError> + Send + Sync;

/// A caller-supplied conversion from a raw lexical value to a [`Value`].
///
/// Columns using a converter are stored as [`DataType::Generic`] keyed by the converter's label.
#[derive(Clone)]
pub struct Converter {
    label: String,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Create a converter. `label` names the resulting generic storage type.
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    /// Label of the generic storage type.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the conversion.
    pub fn convert(&self, raw: &str) -> Result<Value, BoxError> {
        (self.func)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("label", &self.label).finish()
    }
}

/// How a field should be coerced and stored.
///
/// Resolved once per column during schema resolution and never re-inspected per row.
#[derive(Debug, Clone)]
pub enum TypeHint {
    /// Store the lexical form verbatim.
    Utf8,
    /// Parse as a 64-bit float.
    Float64,
    /// Parse as a 64-bit signed integer.
    Int64,
    /// Boolean tokens (`true`/`false`/`1`/`0`), stored as `1`/`0` in an Int64 column.
    Bool,
    /// Parse as a timestamp using the dialect's layout.
    Time,
    /// Opaque storage keyed by a type label; the lexical form is kept as a `String` payload.
    Generic(String),
    /// Run a custom converter for every non-null value.
    Custom(Converter),
}

impl TypeHint {
    /// Interpret a type label from configuration.
    ///
    /// Unrecognized labels select [`TypeHint::Generic`] keyed by that label.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "string" | "utf8" | "text" => Self::Utf8,
            "float64" | "float" | "double" => Self::Float64,
            "int64" | "int" | "integer" => Self::Int64,
            "bool" | "boolean" => Self::Bool,
            "time" | "timestamp" | "datetime" => Self::Time,
            _ => Self::Generic(label.to_string()),
        }
    }

    /// Storage type of a column resolved to this hint.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Utf8 => DataType::Utf8,
            Self::Float64 => DataType::Float64,
            Self::Int64 | Self::Bool => DataType::Int64,
            Self::Time => DataType::Time,
            Self::Generic(label) => DataType::Generic(label.clone()),
            Self::Custom(c) => DataType::Generic(c.label().to_string()),
        }
    }
}

/// Field name → [`TypeHint`] overrides, matched by exact (case-sensitive) name.
///
/// Deserializes from a JSON object of `field -> type label`, see [`TypeHint::from_label`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "HashMap<String, String>")]
pub struct TypeOverrides {
    hints: HashMap<String, TypeHint>,
}

impl TypeOverrides {
    /// Empty override map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, hint: TypeHint) -> Self {
        self.insert(field, hint);
        self
    }

    /// Insert or replace the override for `field`.
    pub fn insert(&mut self, field: impl Into<String>, hint: TypeHint) {
        self.hints.insert(field.into(), hint);
    }

    /// Override for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&TypeHint> {
        self.hints.get(field)
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

impl From<HashMap<String, String>> for TypeOverrides {
    fn from(labels: HashMap<String, String>) -> Self {
        labels
            .into_iter()
            .map(|(field, label)| {
                let hint = TypeHint::from_label(&label);
                (field, hint)
            })
            .collect()
    }
}

impl FromIterator<(String, TypeHint)> for TypeOverrides {
    fn from_iter<I: IntoIterator<Item = (String, TypeHint)>>(iter: I) -> Self {
        Self {
            hints: iter.into_iter().collect(),
        }
    }
}
