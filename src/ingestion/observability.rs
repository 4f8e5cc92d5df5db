//! Outcome reporting for ingestion calls: observer hooks, severities and alert thresholds.

use std::fmt;
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::types::DataSet;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event (e.g. a user-initiated cancellation).
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (I/O or source failures).
    Critical,
}

/// Which import path produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Query-result loading.
    Query,
    /// Structured-record (JSON lines) loading.
    Records,
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Import path used.
    pub source: SourceKind,
    /// Human-readable description of the input (query text, file path, ...).
    pub label: String,
}

/// Minimal stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of ingested rows.
    pub rows: usize,
    /// Number of columns in the resulting table.
    pub columns: usize,
}

/// Receives exactly one outcome per `ingest_query` / `ingest_jsonl*` call.
///
/// A call that returns a table reports [`Self::on_success`] with the final (trimmed) row and
/// column counts. Any error, cancellation included, reports [`Self::on_failure`] with the
/// severity from [`severity_for_error`]; if that severity is at or above the call's
/// `alert_at_or_above`, [`Self::on_alert`] follows.
pub trait IngestionObserver: Send + Sync {
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Cancellation arrives here as [`IngestionSeverity::Info`].
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Defaults to [`Self::on_failure`], so an observer that only implements `on_failure` sees
    /// alerting errors twice.
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Forwards every outcome to each wrapped observer, in order.
///
/// Lets one ingestion call feed e.g. a [`LogObserver`] and a metrics sink at once.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }

    /// Add another observer after the existing ones.
    pub fn push(&mut self, observer: Arc<dyn IngestionObserver>) {
        self.observers.push(observer);
    }

    fn each(&self, f: impl Fn(&dyn IngestionObserver)) {
        self.observers.iter().for_each(|o| f(o.as_ref()));
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Forwards ingestion events to the [`log`] facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl IngestionObserver for LogObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        log::info!(
            "[ingest][ok] source={:?} input={} rows={} columns={}",
            ctx.source,
            ctx.label,
            stats.rows,
            stats.columns
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        let level = match severity {
            IngestionSeverity::Info => log::Level::Info,
            IngestionSeverity::Warning => log::Level::Warn,
            IngestionSeverity::Error | IngestionSeverity::Critical => log::Level::Error,
        };
        log::log!(
            level,
            "[ingest][{:?}] source={:?} input={} err={}",
            severity,
            ctx.source,
            ctx.label,
            error
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        log::error!(
            "[ALERT][ingest][{:?}] source={:?} input={} err={}",
            severity,
            ctx.source,
            ctx.label,
            error
        );
    }
}

/// Severity of a failed ingestion, used for observer callbacks and alert thresholds.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) | IngestionError::Scan { .. } => IngestionSeverity::Critical,
        IngestionError::Json(err) if err.is_io() => IngestionSeverity::Critical,
        IngestionError::Cancelled => IngestionSeverity::Info,
        IngestionError::Json(_)
        | IngestionError::SchemaMismatch { .. }
        | IngestionError::UnsupportedStatementKind { .. }
        | IngestionError::InvalidDialect { .. }
        | IngestionError::Preallocation { .. }
        | IngestionError::NoColumnsFound
        | IngestionError::NoRows
        | IngestionError::Coercion { .. }
        | IngestionError::UnknownField { .. } => IngestionSeverity::Error,
    }
}

/// Report the outcome of one ingestion call to `observer`, if any.
pub(crate) fn report(
    observer: Option<&Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
    ctx: &IngestionContext,
    result: &IngestionResult<DataSet>,
) {
    let Some(obs) = observer else {
        return;
    };
    match result {
        Ok(ds) => obs.on_success(
            ctx,
            IngestionStats {
                rows: ds.row_count(),
                columns: ds.schema.fields.len(),
            },
        ),
        Err(e) => {
            let sev = severity_for_error(e);
            obs.on_failure(ctx, sev, e);
            if sev >= alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}
