//! Schema resolution: turning source metadata (or a first record) plus overrides into
//! [`ColumnDescriptor`]s.
//!
//! Precedence per field, highest first:
//!
//! 1. an explicit entry in [`TypeOverrides`] (exact, case-sensitive name);
//! 2. query path: the source-reported type name through [`hint_for_source_type`];
//! 3. record path: always [`TypeHint::Utf8`], keeping the record's lexical form.

use std::collections::HashSet;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Field, Schema};

use super::hints::{TypeHint, TypeOverrides};
use super::source::{RawRow, SourceColumn};

/// Resolved name + coercion rule for one column. Immutable for the duration of an ingestion call.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub hint: TypeHint,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            hint,
        }
    }

    /// Storage type of the column.
    pub fn data_type(&self) -> DataType {
        self.hint.data_type()
    }

    pub fn field(&self) -> Field {
        Field::new(self.name.clone(), self.data_type())
    }
}

/// Build the destination [`Schema`] for a set of descriptors.
pub fn schema_for(columns: &[ColumnDescriptor]) -> Schema {
    Schema::new(columns.iter().map(ColumnDescriptor::field).collect())
}

/// Map a source-reported type name to a [`TypeHint`].
///
/// Matching is case-insensitive on the trimmed name. Unknown or empty names fall back to
/// [`TypeHint::Utf8`].
pub fn hint_for_source_type(type_name: &str) -> TypeHint {
    match type_name.trim().to_ascii_uppercase().as_str() {
        "VARCHAR" | "TEXT" | "NVARCHAR" | "MEDIUMTEXT" | "LONGTEXT" | "CHAR" => TypeHint::Utf8,
        "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DECIMAL" | "NUMERIC" | "REAL" => TypeHint::Float64,
        "INT" | "TINYINT" | "INT2" | "INT4" | "INT8" | "MEDIUMINT" | "SMALLINT" | "BIGINT"
        | "INTEGER" => TypeHint::Int64,
        "BOOL" | "BOOLEAN" => TypeHint::Bool,
        "DATETIME" | "TIMESTAMP" | "TIMESTAMPTZ" => TypeHint::Time,
        _ => TypeHint::Utf8,
    }
}

/// Resolve query-result columns. Column order follows the result.
pub fn resolve_query_columns(
    columns: &[SourceColumn],
    overrides: &TypeOverrides,
) -> IngestionResult<Vec<ColumnDescriptor>> {
    if columns.is_empty() {
        return Err(IngestionError::NoColumnsFound);
    }

    let mut seen = HashSet::with_capacity(columns.len());
    let mut out = Vec::with_capacity(columns.len());
    for col in columns {
        if !seen.insert(col.name.as_str()) {
            return Err(IngestionError::SchemaMismatch {
                message: format!("duplicate column name '{}' in query result", col.name),
            });
        }
        let hint = match overrides.get(&col.name) {
            Some(h) => h.clone(),
            None => hint_for_source_type(&col.type_name),
        };
        log::debug!(
            "column '{}' (source type '{}') resolved to {}",
            col.name,
            col.type_name,
            hint.data_type()
        );
        out.push(ColumnDescriptor::new(col.name.clone(), hint));
    }
    Ok(out)
}

/// Resolve record columns from the first (already flattened) record.
///
/// The value kinds in the record don't influence the type: without an override every field is
/// stored as [`DataType::Utf8`].
pub fn resolve_record_columns(first: &RawRow, overrides: &TypeOverrides) -> Vec<ColumnDescriptor> {
    first
        .names()
        .map(|name| {
            let hint = overrides.get(name).cloned().unwrap_or(TypeHint::Utf8);
            ColumnDescriptor::new(name, hint)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::source::RawValue;

    #[test]
    fn source_types_map_through_dialect_table() {
        assert_eq!(hint_for_source_type("INT8").data_type(), DataType::Int64);
        assert_eq!(hint_for_source_type("varchar").data_type(), DataType::Utf8);
        assert_eq!(hint_for_source_type("NUMERIC").data_type(), DataType::Float64);
        assert_eq!(hint_for_source_type(" timestamptz ").data_type(), DataType::Time);
        assert!(matches!(hint_for_source_type("BOOL"), TypeHint::Bool));
        assert_eq!(hint_for_source_type("").data_type(), DataType::Utf8);
        assert_eq!(hint_for_source_type("GEOMETRY").data_type(), DataType::Utf8);
    }

    #[test]
    fn overrides_win_over_source_types() {
        let cols = vec![
            SourceColumn::new("id", "VARCHAR"),
            SourceColumn::new("Amount", "INT"),
        ];
        let overrides = TypeOverrides::new()
            .with("id", TypeHint::Int64)
            .with("amount", TypeHint::Float64);
        let resolved = resolve_query_columns(&cols, &overrides).unwrap();
        assert_eq!(resolved[0].data_type(), DataType::Int64);
        // Override names are case-sensitive.
        assert_eq!(resolved[1].data_type(), DataType::Int64);
    }

    #[test]
    fn query_columns_must_exist_and_be_unique() {
        let err = resolve_query_columns(&[], &TypeOverrides::new()).unwrap_err();
        assert!(matches!(err, IngestionError::NoColumnsFound));

        let cols = vec![SourceColumn::new("a", "INT"), SourceColumn::new("a", "TEXT")];
        let err = resolve_query_columns(&cols, &TypeOverrides::new()).unwrap_err();
        assert!(matches!(err, IngestionError::SchemaMismatch { .. }));
    }

    #[test]
    fn record_fields_default_to_utf8() {
        let mut first = RawRow::new();
        first.insert("n".into(), RawValue::Number("1".into()));
        first.insert("b".into(), RawValue::Bool(true));
        first.insert("t".into(), RawValue::Null);
        let resolved = resolve_record_columns(&first, &TypeOverrides::new().with("n", TypeHint::Int64));
        let types: Vec<_> = resolved.iter().map(|c| (c.name.as_str(), c.data_type())).collect();
        assert_eq!(
            types,
            vec![("n", DataType::Int64), ("b", DataType::Utf8), ("t", DataType::Utf8)]
        );
    }
}
