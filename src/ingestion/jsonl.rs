//! Structured-record (JSON lines) ingestion.
//!
//! Input is a stream of self-delimited JSON objects, usually one per line:
//! `{"a":1}\n{"a":2}\n`. Nested objects and arrays are flattened into dot paths
//! (`user.name`, `tags.0`).
//!
//! The first record fixes the column set. Later records may omit fields (stored as null); extra
//! fields are dropped, or rejected when [`RecordLoadOptions::error_on_unknown_fields`] is set.
//! Without an override every column is stored as [`crate::types::DataType::Utf8`]: numbers keep
//! their source lexical form and booleans become `"1"`/`"0"`.
//!
//! Columns of the returned table are sorted by name.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::types::DataSet;

use super::cancel::{checkpoint, CancellationToken};
use super::coerce::{CoercionRules, Dialect};
use super::hints::TypeOverrides;
use super::materialize::Materializer;
use super::observability::{report, IngestionContext, IngestionObserver, IngestionSeverity, SourceKind};
use super::prealloc::{plan_records, PreallocationPlan};
use super::schema::resolve_record_columns;
use super::source::{RecordReader, RowSource};

/// Options controlling structured-record ingestion.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct RecordLoadOptions {
    /// Count records in a pre-pass and preallocate the table. Costs one extra read of the
    /// stream.
    pub large_dataset: bool,
    /// Per-field type overrides (exact, case-sensitive flattened field names).
    pub overrides: TypeOverrides,
    /// Dialect used for timestamp parsing of [`super::hints::TypeHint::Time`] overrides.
    pub dialect: Dialect,
    /// Fail with [`IngestionError::UnknownField`] when a record after the first one has a field
    /// the first record did not.
    pub error_on_unknown_fields: bool,
    /// Cooperative cancellation, polled before each record and during the pre-pass.
    pub cancel: Option<CancellationToken>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for RecordLoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordLoadOptions")
            .field("large_dataset", &self.large_dataset)
            .field("overrides", &self.overrides)
            .field("dialect", &self.dialect)
            .field("error_on_unknown_fields", &self.error_on_unknown_fields)
            .field("cancel_set", &self.cancel.is_some())
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for RecordLoadOptions {
    fn default() -> Self {
        Self {
            large_dataset: false,
            overrides: TypeOverrides::default(),
            dialect: Dialect::default(),
            error_on_unknown_fields: false,
            cancel: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Ingest a JSON lines file.
pub fn ingest_jsonl_from_path(
    path: impl AsRef<Path>,
    options: &RecordLoadOptions,
) -> IngestionResult<DataSet> {
    let path = path.as_ref();
    let ctx = IngestionContext {
        source: SourceKind::Records,
        label: path.display().to_string(),
    };
    let result = File::open(path)
        .map_err(IngestionError::from)
        .and_then(|mut f| load(&mut f, options));
    finish(&ctx, options, result)
}

/// Ingest JSON lines from an in-memory string.
///
/// ```
/// use tabular_ingest::ingestion::{ingest_jsonl_from_str, RecordLoadOptions};
/// use tabular_ingest::types::Value;
///
/// # fn main() -> Result<(), tabular_ingest::IngestionError> {
/// let input = "{\"a\":1,\"b\":\"x\"}\n{\"a\":2,\"b\":\"y\",\"c\":\"extra\"}\n";
/// let ds = ingest_jsonl_from_str(input, &RecordLoadOptions::default())?;
/// assert_eq!(ds.column_names(), vec!["a", "b"]);
/// assert_eq!(ds.value(1, "a"), Some(&Value::Utf8("2".to_string())));
/// # Ok(())
/// # }
/// ```
pub fn ingest_jsonl_from_str(input: &str, options: &RecordLoadOptions) -> IngestionResult<DataSet> {
    ingest_jsonl(Cursor::new(input.as_bytes()), options)
}

/// Ingest JSON lines from a seekable reader.
///
/// The reader is only rewound when [`RecordLoadOptions::large_dataset`] is set, and then only to
/// the position it had when passed in.
pub fn ingest_jsonl<R: Read + Seek>(mut reader: R, options: &RecordLoadOptions) -> IngestionResult<DataSet> {
    let ctx = IngestionContext {
        source: SourceKind::Records,
        label: "jsonl stream".to_string(),
    };
    let result = load(&mut reader, options);
    finish(&ctx, options, result)
}

fn finish(
    ctx: &IngestionContext,
    options: &RecordLoadOptions,
    result: IngestionResult<DataSet>,
) -> IngestionResult<DataSet> {
    if let Ok(ds) = &result {
        log::info!("ingested {} record(s) from {}", ds.row_count(), ctx.label);
    }
    report(options.observer.as_ref(), options.alert_at_or_above, ctx, &result);
    result
}

fn load<R: Read + Seek>(reader: &mut R, options: &RecordLoadOptions) -> IngestionResult<DataSet> {
    let cancel = options.cancel.as_ref();
    let plan = if options.large_dataset {
        plan_records(reader, cancel)?
    } else {
        PreallocationPlan::none()
    };

    let mut source = RecordReader::new(BufReader::new(reader));

    checkpoint(cancel)?;
    let first = source.next_row()?.ok_or(IngestionError::NoRows)?;
    let columns = resolve_record_columns(&first, &options.overrides);
    log::debug!("first record fixed {} column(s)", columns.len());

    let rules = CoercionRules {
        dialect: options.dialect,
        bool_tokens_as_int: false,
    };
    let mut table = Materializer::new(&columns, rules, plan, cancel)?;
    table.materialize(1, &first)?;

    let mut row_num = 1;
    loop {
        table.checkpoint()?;
        let Some(raw) = source.next_row()? else {
            break;
        };
        row_num += 1;

        for name in raw.names().filter(|n| !first.contains(n)) {
            if options.error_on_unknown_fields {
                return Err(IngestionError::UnknownField {
                    row: row_num,
                    field: name.to_string(),
                });
            }
            log::trace!("dropping unknown field '{name}' at row {row_num}");
        }
        table.materialize(row_num, &raw)?;
    }

    let mut ds = table.finish();
    let mut names = ds.column_names();
    names.sort();
    ds.reorder_columns(names.as_slice())?;
    Ok(ds)
}
