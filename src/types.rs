//! Core data model types for ingestion.
//!
//! Ingestion produces an in-memory [`DataSet`] whose [`Schema`] (a list of typed [`Field`]s) is
//! resolved from the source, optionally steered by caller-provided type overrides.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{IngestionError, IngestionResult};

/// Logical storage type for a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// UTF-8 string, stored verbatim.
    Utf8,
    /// 64-bit floating point number.
    Float64,
    /// 64-bit signed integer.
    Int64,
    /// Instant in time (UTC).
    Time,
    /// Opaque caller-defined values, keyed by a type label.
    Generic(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => f.write_str("Utf8"),
            Self::Float64 => f.write_str("Float64"),
            Self::Int64 => f.write_str("Int64"),
            Self::Time => f.write_str("Time"),
            Self::Generic(label) => write!(f, "Generic({label})"),
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns a field by name, if present.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Payload of a [`Value::Generic`] cell.
///
/// Implemented for every `'static` type that is `Debug + PartialEq + Send + Sync`, so custom
/// converters can store their own types without extra boilerplate.
pub trait GenericData: Any + fmt::Debug + Send + Sync {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Equality across erased payloads. Payloads of different concrete types are never equal.
    fn dyn_eq(&self, other: &dyn GenericData) -> bool;
}

impl<T> GenericData for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn GenericData) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| self == o)
    }
}

/// A shared, type-erased value stored in a [`DataType::Generic`] column.
#[derive(Clone)]
pub struct GenericValue(Arc<dyn GenericData>);

impl GenericValue {
    /// Wrap a caller-defined value.
    pub fn new<T: GenericData>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GenericValue").field(&self.0).finish()
    }
}

impl PartialEq for GenericValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.as_ref().dyn_eq(other.0.as_ref())
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/null value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Instant in time.
    Time(DateTime<Utc>),
    /// Caller-defined value.
    Generic(GenericValue),
}

impl Value {
    /// Convenience constructor for [`Value::Generic`].
    pub fn generic<T: GenericData>(value: T) -> Self {
        Self::Generic(GenericValue::new(value))
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// In-memory tabular dataset; the destination of every ingestion call.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. Ingestion
/// owns the dataset exclusively while building it, so the borrow checker stands in for the
/// table lock: no other code can observe or mutate it until the call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Create a dataset holding `capacity` all-null placeholder rows.
    ///
    /// Placeholders are filled with [`Self::update_row`] and any left over are dropped with
    /// [`Self::remove_last_row`]. Fails with [`IngestionError::Preallocation`] when the row
    /// storage can't be reserved.
    pub fn preallocated(schema: Schema, capacity: usize) -> IngestionResult<Self> {
        let width = schema.fields.len();
        let mut rows: Vec<Vec<Value>> = Vec::new();
        rows.try_reserve_exact(capacity)
            .map_err(|e| IngestionError::Preallocation {
                rows: capacity,
                message: e.to_string(),
            })?;
        rows.resize_with(capacity, || vec![Value::Null; width]);
        Ok(Self { schema, rows })
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.field_names().map(str::to_string).collect()
    }

    /// Returns the cell at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate all values of a column, top to bottom.
    pub fn column(&self, column: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Append an all-null placeholder row.
    pub fn append_placeholder_row(&mut self) {
        self.rows.push(vec![Value::Null; self.schema.fields.len()]);
    }

    /// Replace the row at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `row` does not match the schema length.
    pub fn update_row(&mut self, index: usize, row: Vec<Value>) {
        assert!(
            row.len() == self.schema.fields.len(),
            "row length {} does not match schema length {}",
            row.len(),
            self.schema.fields.len()
        );
        self.rows[index] = row;
    }

    /// Remove and return the last row, if any.
    pub fn remove_last_row(&mut self) -> Option<Vec<Value>> {
        self.rows.pop()
    }

    /// Reorder columns to match `names`.
    ///
    /// `names` must be a permutation of the current column names.
    pub fn reorder_columns<S: AsRef<str>>(&mut self, names: &[S]) -> IngestionResult<()> {
        if names.len() != self.schema.fields.len() {
            return Err(IngestionError::SchemaMismatch {
                message: format!(
                    "reorder expects {} column names, got {}",
                    self.schema.fields.len(),
                    names.len()
                ),
            });
        }

        let mut order = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let idx = self.schema.index_of(name).ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("cannot reorder: unknown column '{name}'"),
            })?;
            if order.contains(&idx) {
                return Err(IngestionError::SchemaMismatch {
                    message: format!("cannot reorder: column '{name}' listed twice"),
                });
            }
            order.push(idx);
        }

        self.schema.fields = order.iter().map(|&i| self.schema.fields[i].clone()).collect();
        for row in &mut self.rows {
            let mut old = std::mem::take(row);
            *row = order.iter().map(|&i| std::mem::replace(&mut old[i], Value::Null)).collect();
        }
        Ok(())
    }
}
