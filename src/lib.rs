//! `tabular-ingest` loads semi-structured, dynamically-typed rows into a strongly-typed
//! in-memory [`types::DataSet`].
//!
//! Two sources are supported:
//!
//! - **Query results** through [`ingestion::ingest_query`]. Drivers plug in by implementing
//!   [`ingestion::PreparedQuery`] or [`ingestion::QueryExecutor`] and [`ingestion::RowCursor`].
//! - **JSON lines** through [`ingestion::ingest_jsonl`] and friends.
//!
//! ## How column types are chosen
//!
//! Per field, highest precedence first:
//!
//! 1. an entry in [`ingestion::TypeOverrides`] (exact, case-sensitive name);
//! 2. for query results, the driver-reported type name (`INT8` → Int64, `VARCHAR` → Utf8,
//!    `TIMESTAMP` → Time, ...; unknown names fall back to Utf8);
//! 3. for JSON records, always Utf8, keeping each value's lexical form.
//!
//! Supported storage types are [`types::DataType::Utf8`], [`types::DataType::Float64`],
//! [`types::DataType::Int64`], [`types::DataType::Time`] and [`types::DataType::Generic`]
//! (custom converters). Nulls are always preserved as [`types::Value::Null`] and never coerced.
//!
//! ## Quick example: JSON lines
//!
//! ```rust
//! use tabular_ingest::ingestion::{ingest_jsonl_from_str, RecordLoadOptions, TypeHint, TypeOverrides};
//! use tabular_ingest::types::{DataType, Value};
//!
//! # fn main() -> Result<(), tabular_ingest::IngestionError> {
//! let input = r#"
//! {"id": 1, "user": {"name": "Ada"}, "active": true}
//! {"id": 2, "user": {"name": "Grace"}, "active": false}
//! "#;
//! let opts = RecordLoadOptions {
//!     overrides: TypeOverrides::new().with("id", TypeHint::Int64),
//!     ..Default::default()
//! };
//! let ds = ingest_jsonl_from_str(input, &opts)?;
//!
//! assert_eq!(ds.column_names(), vec!["active", "id", "user.name"]);
//! assert_eq!(ds.schema.field("id").map(|f| &f.data_type), Some(&DataType::Int64));
//! assert_eq!(ds.value(0, "active"), Some(&Value::Utf8("1".to_string())));
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick example: query results
//!
//! ```rust
//! use tabular_ingest::ingestion::memory::MemoryStatement;
//! use tabular_ingest::ingestion::{ingest_query, Dialect, QueryLoadOptions, SourceColumn, Statement};
//! use tabular_ingest::types::Value;
//!
//! # fn main() -> Result<(), tabular_ingest::IngestionError> {
//! let mut stmt = MemoryStatement::new(
//!     vec![SourceColumn::new("id", "BIGINT"), SourceColumn::new("seen", "DATETIME")],
//!     vec![vec![Some("7".into()), Some("2021-05-01 12:00:00".into())]],
//! );
//! let opts = QueryLoadOptions {
//!     dialect: "mysql".parse::<Dialect>()?,
//!     known_row_count: Some(100),
//!     ..Default::default()
//! };
//! let ds = ingest_query(Statement::Prepared(&mut stmt), &[], &opts)?;
//! assert_eq!(ds.row_count(), 1);
//! assert!(matches!(ds.value(0, "seen"), Some(Value::Time(_))));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: entrypoints, schema resolution, coercion and source adapters
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: error types used across ingestion

pub mod error;
pub mod ingestion;
pub mod types;

pub use error::{IngestionError, IngestionResult};
