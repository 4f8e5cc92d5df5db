//! In-memory query source.
//!
//! Useful when rows were already fetched by some other client, and as a stand-in driver in tests.

use std::collections::VecDeque;

use crate::types::Value;

use super::hints::BoxError;
use super::source::{PreparedQuery, QueryExecutor, RowCursor, SourceColumn};

type Cells = Vec<Option<String>>;

/// A [`RowCursor`] over rows held in memory.
#[derive(Debug, Clone)]
pub struct MemoryCursor {
    columns: Vec<SourceColumn>,
    rows: VecDeque<Cells>,
}

impl MemoryCursor {
    pub fn new(columns: Vec<SourceColumn>, rows: Vec<Cells>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

impl RowCursor for MemoryCursor {
    fn column_types(&self) -> Result<Vec<SourceColumn>, BoxError> {
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Result<Option<Cells>, BoxError> {
        Ok(self.rows.pop_front())
    }
}

/// A statement that replays the same in-memory result on every execution.
///
/// Implements both [`PreparedQuery`] and [`QueryExecutor`]; the last query text and arguments
/// are recorded for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatement {
    columns: Vec<SourceColumn>,
    rows: Vec<Cells>,
    last_query: Option<String>,
    last_args: Vec<Value>,
}

impl MemoryStatement {
    pub fn new(columns: Vec<SourceColumn>, rows: Vec<Cells>) -> Self {
        Self {
            columns,
            rows,
            ..Default::default()
        }
    }

    /// Query text of the most recent [`QueryExecutor::execute`] call.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Arguments of the most recent execution.
    pub fn last_args(&self) -> &[Value] {
        &self.last_args
    }

    fn cursor(&self) -> Box<dyn RowCursor> {
        Box::new(MemoryCursor::new(self.columns.clone(), self.rows.clone()))
    }
}

impl PreparedQuery for MemoryStatement {
    fn execute(&mut self, args: &[Value]) -> Result<Box<dyn RowCursor + '_>, BoxError> {
        self.last_args = args.to_vec();
        Ok(self.cursor())
    }
}

impl QueryExecutor for MemoryStatement {
    fn execute(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn RowCursor + '_>, BoxError> {
        self.last_query = Some(query.to_string());
        self.last_args = args.to_vec();
        Ok(self.cursor())
    }
}
