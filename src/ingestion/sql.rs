//! Query-result ingestion.
//!
//! Column types come from the cursor's metadata (through the dialect type table) unless
//! overridden. Values arrive as text and are coerced per column; SQL NULL stays null.

use std::fmt;
use std::sync::Arc;

use crate::error::IngestionResult;
use crate::types::{DataSet, Value};

use super::cancel::{checkpoint, CancellationToken};
use super::coerce::{CoercionRules, Dialect};
use super::hints::TypeOverrides;
use super::materialize::Materializer;
use super::observability::{report, IngestionContext, IngestionObserver, IngestionSeverity, SourceKind};
use super::prealloc::PreallocationPlan;
use super::schema::resolve_query_columns;
use super::source::{open_cursor, QueryRows, RowSource, Statement};

/// Options controlling query-result ingestion.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct QueryLoadOptions {
    /// Known (or estimated) row count. When set, the table is preallocated and unused rows are
    /// trimmed at the end.
    pub known_row_count: Option<usize>,
    /// Per-column type overrides (exact, case-sensitive column names).
    pub overrides: TypeOverrides,
    /// Dialect used for timestamp parsing.
    pub dialect: Dialect,
    /// Query text for [`Statement::Executor`]; ignored by prepared statements.
    pub query: Option<String>,
    /// Cooperative cancellation, polled before each row.
    pub cancel: Option<CancellationToken>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for QueryLoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryLoadOptions")
            .field("known_row_count", &self.known_row_count)
            .field("overrides", &self.overrides)
            .field("dialect", &self.dialect)
            .field("query", &self.query)
            .field("cancel_set", &self.cancel.is_some())
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for QueryLoadOptions {
    fn default() -> Self {
        Self {
            known_row_count: None,
            overrides: TypeOverrides::default(),
            dialect: Dialect::default(),
            query: None,
            cancel: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Execute `statement` with positional `args` and load the whole result into a [`DataSet`].
///
/// The cursor is closed on every exit path. Any error aborts the call; no partial table is
/// returned.
///
/// ```
/// use tabular_ingest::ingestion::memory::MemoryStatement;
/// use tabular_ingest::ingestion::source::{SourceColumn, Statement};
/// use tabular_ingest::ingestion::{ingest_query, QueryLoadOptions};
/// use tabular_ingest::types::Value;
///
/// # fn main() -> Result<(), tabular_ingest::IngestionError> {
/// let mut stmt = MemoryStatement::new(
///     vec![SourceColumn::new("id", "INT8"), SourceColumn::new("name", "VARCHAR")],
///     vec![vec![Some("1".into()), Some("Ada".into())]],
/// );
/// let ds = ingest_query(Statement::Prepared(&mut stmt), &[], &QueryLoadOptions::default())?;
/// assert_eq!(ds.value(0, "id"), Some(&Value::Int64(1)));
/// # Ok(())
/// # }
/// ```
pub fn ingest_query(
    statement: Statement<'_>,
    args: &[Value],
    options: &QueryLoadOptions,
) -> IngestionResult<DataSet> {
    let ctx = IngestionContext {
        source: SourceKind::Query,
        label: match &options.query {
            Some(q) => format!("{} statement: {q}", statement.kind()),
            None => format!("{} statement", statement.kind()),
        },
    };

    let result = load(statement, args, options);
    if let Ok(ds) = &result {
        log::info!("ingested {} row(s) from {}", ds.row_count(), ctx.label);
    }
    report(options.observer.as_ref(), options.alert_at_or_above, &ctx, &result);
    result
}

fn load(statement: Statement<'_>, args: &[Value], options: &QueryLoadOptions) -> IngestionResult<DataSet> {
    checkpoint(options.cancel.as_ref())?;
    let cursor = open_cursor(statement, options.query.as_deref(), args)?;
    let mut rows = QueryRows::new(cursor);

    match materialize(&mut rows, options) {
        Ok(ds) => {
            rows.close()?;
            Ok(ds)
        }
        Err(e) => {
            if let Err(close_err) = rows.close() {
                log::warn!("ignoring cursor close failure after error: {close_err}");
            }
            Err(e)
        }
    }
}

fn materialize(rows: &mut QueryRows<'_>, options: &QueryLoadOptions) -> IngestionResult<DataSet> {
    let columns = resolve_query_columns(rows.describe()?, &options.overrides)?;
    let plan = PreallocationPlan::from_known_count(options.known_row_count);
    if let Some(n) = plan.capacity() {
        log::debug!("preallocating {n} row(s) from declared row count");
    }

    let rules = CoercionRules {
        dialect: options.dialect,
        bool_tokens_as_int: true,
    };
    let mut table = Materializer::new(&columns, rules, plan, options.cancel.as_ref())?;
    loop {
        table.checkpoint()?;
        let Some(raw) = rows.next_row()? else {
            break;
        };
        table.materialize(table.committed() + 1, &raw)?;
    }
    Ok(table.finish())
}
