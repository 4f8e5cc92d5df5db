use thiserror::Error;

use crate::types::DataType;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared by the query-result and structured-record import paths.
/// Every variant is terminal for the ingestion call that produced it: no partially built
/// [`crate::types::DataSet`] is ever returned alongside an error.
///
/// Row numbers are 1-based positions in the source (the first row/record is row 1).
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, stream read or seek failure).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A structured record could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The produced or requested table shape is inconsistent (duplicate columns, bad reorder, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The statement handed to the query path cannot be executed as given.
    #[error("unsupported statement kind: {message}")]
    UnsupportedStatementKind { message: String },

    /// The configured dialect name is not recognized.
    #[error("invalid dialect '{name}' (expected postgres or mysql)")]
    InvalidDialect { name: String },

    /// The planned row capacity could not be reserved up front.
    #[error("can't preallocate {rows} row(s): {message}")]
    Preallocation { rows: usize, message: String },

    /// The query result reported no columns.
    #[error("no columns found in query result")]
    NoColumnsFound,

    /// The source produced zero records, so no table could be built.
    #[error("no rows decoded")]
    NoRows,

    /// The source failed while producing a row.
    #[error("scan error at row {row}: {message}")]
    Scan { row: usize, message: String },

    /// A value could not be coerced into the column's declared [`DataType`].
    #[error("can't coerce '{raw}' to {target} at row {row} field '{field}': {message}")]
    Coercion {
        row: usize,
        field: String,
        raw: String,
        target: DataType,
        message: String,
    },

    /// A record after the first one carried a field the first record did not (strict mode only).
    #[error("unknown field encountered at row {row}: '{field}'")]
    UnknownField { row: usize, field: String },

    /// The caller's cancellation token was triggered.
    #[error("ingestion cancelled")]
    Cancelled,
}

impl IngestionError {
    /// Returns `true` if this error is a user-initiated abort rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn scan(row: usize, message: impl Into<String>) -> Self {
        Self::Scan {
            row,
            message: message.into(),
        }
    }
}
