//! Source adapters.
//!
//! Two sources feed the engine:
//!
//! - **Query results**: a [`Statement`] is executed into a [`RowCursor`], whose column metadata
//!   is read once before any row is pulled. Driver crates plug in by implementing
//!   [`PreparedQuery`] or [`QueryExecutor`] plus [`RowCursor`].
//! - **Structured records**: a stream of self-delimited JSON objects, decoded one at a time and
//!   flattened into dot-path keys (`user.name`, `tags.0`).
//!
//! Both produce [`RawRow`]s through the crate-internal [`RowSource`] trait.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use serde_json::de::IoRead;
use serde_json::StreamDeserializer;

use crate::error::{IngestionError, IngestionResult};
use crate::types::Value;

use super::hints::BoxError;

/// One untyped cell as produced by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Null or absent.
    Null,
    /// Text as produced by the source.
    Text(String),
    /// A numeric literal in its source lexical form.
    Number(String),
    /// A boolean literal.
    Bool(bool),
}

impl RawValue {
    /// Lexical form handed to coercion, or `None` for null.
    ///
    /// Booleans become `"1"`/`"0"`, so a record-path boolean without an override is stored as
    /// that string and coerces to `1`/`0` in integer columns.
    pub fn lexical(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Text(s) | Self::Number(s) => Some(Cow::Borrowed(s)),
            Self::Bool(true) => Some(Cow::Borrowed("1")),
            Self::Bool(false) => Some(Cow::Borrowed("0")),
        }
    }
}

/// An ordered field → [`RawValue`] association for one source row.
///
/// Inserting an existing name overwrites its value in place (last write wins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: Vec<(String, RawValue)>,
    index: HashMap<String, usize>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field.
    pub fn insert(&mut self, name: String, value: RawValue) {
        match self.index.get(&name) {
            Some(&i) => self.fields[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.fields.len());
                self.fields.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Field names in first-insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Anything that yields raw rows until exhausted.
pub(crate) trait RowSource {
    /// `Ok(None)` signals end of input.
    fn next_row(&mut self) -> IngestionResult<Option<RawRow>>;
}

/// Column metadata reported by a query cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    /// Column name.
    pub name: String,
    /// Source-reported type name (e.g. `VARCHAR`, `INT8`). Empty when the driver doesn't know.
    pub type_name: String,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A query result being read row by row.
pub trait RowCursor {
    /// Column names and source type names, in result order.
    fn column_types(&self) -> Result<Vec<SourceColumn>, BoxError>;

    /// Next row as one textual cell per column (`None` for SQL NULL); `Ok(None)` at the end.
    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>, BoxError>;

    /// Release the cursor. Called exactly once by the engine, on success and on failure.
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// An already-prepared statement: executes with positional arguments only.
pub trait PreparedQuery {
    fn execute(&mut self, args: &[Value]) -> Result<Box<dyn RowCursor + '_>, BoxError>;
}

/// A connection-like handle: executes explicit query text with positional arguments.
pub trait QueryExecutor {
    fn execute(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn RowCursor + '_>, BoxError>;
}

/// The statement handed to [`crate::ingestion::sql::ingest_query`].
///
/// The caller picks the variant; the engine never probes for capabilities.
pub enum Statement<'a> {
    /// Execute with arguments only.
    Prepared(&'a mut dyn PreparedQuery),
    /// Execute the configured query text with arguments.
    Executor(&'a mut dyn QueryExecutor),
}

impl Statement<'_> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Prepared(_) => "prepared",
            Self::Executor(_) => "executor",
        }
    }
}

/// Execute `statement`, preferring the argument-only form.
pub(crate) fn open_cursor<'a>(
    statement: Statement<'a>,
    query: Option<&str>,
    args: &[Value],
) -> IngestionResult<Box<dyn RowCursor + 'a>> {
    let result = match statement {
        Statement::Prepared(stmt) => stmt.execute(args),
        Statement::Executor(exec) => {
            let query = query.map(str::trim).filter(|q| !q.is_empty()).ok_or_else(|| {
                IngestionError::UnsupportedStatementKind {
                    message: "executor statements need query text (set QueryLoadOptions::query)"
                        .to_string(),
                }
            })?;
            exec.execute(query, args)
        }
    };
    result.map_err(|e| IngestionError::scan(0, format!("execute failed: {e}")))
}

/// Adapts a [`RowCursor`] into named [`RawRow`]s.
pub(crate) struct QueryRows<'c> {
    cursor: Box<dyn RowCursor + 'c>,
    columns: Vec<SourceColumn>,
    row: usize,
}

impl<'c> QueryRows<'c> {
    pub(crate) fn new(cursor: Box<dyn RowCursor + 'c>) -> Self {
        Self {
            cursor,
            columns: Vec::new(),
            row: 0,
        }
    }

    /// Read column metadata. Must be called once, before any row is pulled.
    pub(crate) fn describe(&mut self) -> IngestionResult<&[SourceColumn]> {
        self.columns = self
            .cursor
            .column_types()
            .map_err(|e| IngestionError::scan(0, format!("column metadata unavailable: {e}")))?;
        Ok(&self.columns)
    }

    pub(crate) fn close(&mut self) -> IngestionResult<()> {
        self.cursor
            .close()
            .map_err(|e| IngestionError::scan(self.row, format!("close failed: {e}")))
    }
}

impl RowSource for QueryRows<'_> {
    fn next_row(&mut self) -> IngestionResult<Option<RawRow>> {
        let row_num = self.row + 1;
        let cells = match self.cursor.next_row() {
            Ok(Some(cells)) => cells,
            Ok(None) => return Ok(None),
            Err(e) => return Err(IngestionError::scan(row_num, e.to_string())),
        };
        if cells.len() != self.columns.len() {
            return Err(IngestionError::scan(
                row_num,
                format!("expected {} cells, got {}", self.columns.len(), cells.len()),
            ));
        }
        self.row = row_num;

        let mut raw = RawRow::new();
        for (col, cell) in self.columns.iter().zip(cells) {
            let value = cell.map_or(RawValue::Null, RawValue::Text);
            raw.insert(col.name.clone(), value);
        }
        Ok(Some(raw))
    }
}

/// Decodes a stream of self-delimited JSON objects into flattened [`RawRow`]s.
pub(crate) struct RecordReader<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, serde_json::Value>,
    row: usize,
}

impl<R: Read> RecordReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(reader).into_iter(),
            row: 0,
        }
    }
}

impl<R: Read> RowSource for RecordReader<R> {
    fn next_row(&mut self) -> IngestionResult<Option<RawRow>> {
        let value = match self.stream.next() {
            None => return Ok(None),
            Some(v) => v?,
        };
        self.row += 1;

        match value {
            serde_json::Value::Object(map) => {
                let mut row = RawRow::new();
                for (key, v) in map {
                    flatten_into(&mut row, key, v);
                }
                Ok(Some(row))
            }
            other => Err(IngestionError::scan(
                self.row,
                format!("expected a json object, found {}", json_kind(&other)),
            )),
        }
    }
}

/// Flatten `value` under `key`: objects extend the path with `.field`, arrays with `.index`.
fn flatten_into(row: &mut RawRow, key: String, value: serde_json::Value) {
    match value {
        serde_json::Value::Null => row.insert(key, RawValue::Null),
        serde_json::Value::Bool(b) => row.insert(key, RawValue::Bool(b)),
        serde_json::Value::Number(n) => row.insert(key, RawValue::Number(n.to_string())),
        serde_json::Value::String(s) => row.insert(key, RawValue::Text(s)),
        serde_json::Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                flatten_into(row, format!("{key}.{i}"), item);
            }
        }
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                flatten_into(row, format!("{key}.{k}"), v);
            }
        }
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::memory::{MemoryCursor, MemoryStatement};

    fn read_all(input: &str) -> IngestionResult<Vec<RawRow>> {
        let mut reader = RecordReader::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(row) = reader.next_row()? {
            out.push(row);
        }
        Ok(out)
    }

    #[test]
    fn records_flatten_nested_objects_and_arrays() {
        let rows = read_all(r#"{"id":7,"user":{"name":"Ada","tags":["x","y"]},"empty":{},"ok":true}"#).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(
            r.names().collect::<Vec<_>>(),
            vec!["id", "user.name", "user.tags.0", "user.tags.1", "ok"]
        );
        assert_eq!(r.get("id"), Some(&RawValue::Number("7".into())));
        assert_eq!(r.get("user.tags.1"), Some(&RawValue::Text("y".into())));
        assert_eq!(r.get("ok").and_then(RawValue::lexical).as_deref(), Some("1"));
    }

    #[test]
    fn flattened_collisions_are_last_write_wins() {
        let rows = read_all(r#"{"a.b":"first","a":{"b":"second"}}"#).unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get("a.b"), Some(&RawValue::Text("second".into())));
    }

    #[test]
    fn numbers_keep_their_lexical_form() {
        let rows = read_all("{\"big\":12345678901234567890123,\"f\":1.50,\"e\":1e3}").unwrap();
        assert_eq!(rows[0].get("big"), Some(&RawValue::Number("12345678901234567890123".into())));
        assert_eq!(rows[0].get("f"), Some(&RawValue::Number("1.50".into())));
        assert_eq!(rows[0].get("e"), Some(&RawValue::Number("1e3".into())));
    }

    #[test]
    fn records_are_self_delimited_and_must_be_objects() {
        let rows = read_all("{\"a\":1}{\"a\":2}\n\n  {\"a\":3}").unwrap();
        assert_eq!(rows.len(), 3);

        let err = read_all("{\"a\":1}\n[1,2]").unwrap_err();
        assert!(matches!(err, IngestionError::Scan { row: 2, .. }));

        let err = read_all("{\"a\":1}\n{\"a\":").unwrap_err();
        assert!(matches!(err, IngestionError::Json(_)));
    }

    #[test]
    fn executor_statement_requires_query_text() {
        let mut stmt = MemoryStatement::new(vec![SourceColumn::new("a", "INT")], vec![]);
        let err = open_cursor(Statement::Executor(&mut stmt), Some("  "), &[]).err().unwrap();
        assert!(matches!(err, IngestionError::UnsupportedStatementKind { .. }));

        let cursor = open_cursor(Statement::Executor(&mut stmt), Some("select a"), &[]);
        assert!(cursor.is_ok());
    }

    #[test]
    fn query_rows_check_row_width() {
        let cursor = MemoryCursor::new(
            vec![SourceColumn::new("a", "INT"), SourceColumn::new("b", "TEXT")],
            vec![vec![Some("1".into()), None], vec![Some("2".into())]],
        );
        let mut rows = QueryRows::new(Box::new(cursor));
        assert_eq!(rows.describe().unwrap().len(), 2);
        let first = rows.next_row().unwrap().unwrap();
        assert_eq!(first.get("b"), Some(&RawValue::Null));
        let err = rows.next_row().unwrap_err();
        assert!(matches!(err, IngestionError::Scan { row: 2, .. }));
    }
}
