//! Ingestion entrypoints and implementations.
//!
//! Two import paths share one engine:
//!
//! - [`ingest_query`] (from [`sql`]) loads a query result from a [`source::Statement`]
//! - [`ingest_jsonl`] / [`ingest_jsonl_from_path`] / [`ingest_jsonl_from_str`] (from [`jsonl`])
//!   load a stream of JSON records
//!
//! Both resolve a schema ([`schema`]), optionally preallocate the table ([`prealloc`]), coerce
//! every value ([`coerce`]) and report success/failure/alerts to an optional
//! [`IngestionObserver`].

pub mod cancel;
pub mod coerce;
pub mod hints;
pub mod jsonl;
mod materialize;
pub mod memory;
pub mod observability;
pub mod prealloc;
pub mod schema;
pub mod source;
pub mod sql;

pub use cancel::CancellationToken;
pub use coerce::Dialect;
pub use hints::{BoxError, Converter, TypeHint, TypeOverrides};
pub use jsonl::{ingest_jsonl, ingest_jsonl_from_path, ingest_jsonl_from_str, RecordLoadOptions};
pub use observability::{
    severity_for_error, CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStats, LogObserver, SourceKind,
};
pub use schema::ColumnDescriptor;
pub use source::{PreparedQuery, QueryExecutor, RowCursor, SourceColumn, Statement};
pub use sql::{ingest_query, QueryLoadOptions};
