#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tabular_ingest::ingestion::memory::MemoryCursor;
use tabular_ingest::ingestion::{BoxError, PreparedQuery, RowCursor, SourceColumn};
use tabular_ingest::types::Value;

pub type Cells = Vec<Option<String>>;

/// Builds a row of cells from string slices; `None` is SQL NULL.
pub fn cells(values: &[Option<&str>]) -> Cells {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

/// A prepared statement whose cursor records whether it was closed and can fail mid-stream.
pub struct TrackingStatement {
    columns: Vec<SourceColumn>,
    rows: Vec<Cells>,
    fail_at_row: Option<usize>,
    closed: Arc<AtomicBool>,
}

impl TrackingStatement {
    pub fn new(columns: Vec<SourceColumn>, rows: Vec<Cells>) -> Self {
        Self {
            columns,
            rows,
            fail_at_row: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the cursor fail when asked for 1-based row `row`.
    pub fn failing_at(mut self, row: usize) -> Self {
        self.fail_at_row = Some(row);
        self
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl PreparedQuery for TrackingStatement {
    fn execute(&mut self, _args: &[Value]) -> Result<Box<dyn RowCursor + '_>, BoxError> {
        Ok(Box::new(TrackingCursor {
            inner: MemoryCursor::new(self.columns.clone(), self.rows.clone()),
            served: 0,
            fail_at_row: self.fail_at_row,
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct TrackingCursor {
    inner: MemoryCursor,
    served: usize,
    fail_at_row: Option<usize>,
    closed: Arc<AtomicBool>,
}

impl RowCursor for TrackingCursor {
    fn column_types(&self) -> Result<Vec<SourceColumn>, BoxError> {
        self.inner.column_types()
    }

    fn next_row(&mut self) -> Result<Option<Cells>, BoxError> {
        self.served += 1;
        if self.fail_at_row == Some(self.served) {
            return Err("connection reset by peer".into());
        }
        self.inner.next_row()
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
