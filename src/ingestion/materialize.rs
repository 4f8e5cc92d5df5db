//! Row materialization: coerce each raw row against the resolved columns and commit it to the
//! destination table.
//!
//! A row is coerced completely before anything is written, so a coercion failure never leaves a
//! half-written row behind.

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Value};

use super::cancel::{checkpoint, CancellationToken};
use super::coerce::{coerce, CoercionRules};
use super::prealloc::PreallocationPlan;
use super::schema::{schema_for, ColumnDescriptor};
use super::source::{RawRow, RawValue};

pub(crate) struct Materializer<'a> {
    columns: &'a [ColumnDescriptor],
    rules: CoercionRules,
    plan: PreallocationPlan,
    table: DataSet,
    committed: usize,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Materializer<'a> {
    pub(crate) fn new(
        columns: &'a [ColumnDescriptor],
        rules: CoercionRules,
        plan: PreallocationPlan,
        cancel: Option<&'a CancellationToken>,
    ) -> IngestionResult<Self> {
        let table = plan.new_table(schema_for(columns))?;
        Ok(Self {
            columns,
            rules,
            plan,
            table,
            committed: 0,
            cancel,
        })
    }

    /// Cancellation checkpoint; call before starting work on each row.
    pub(crate) fn checkpoint(&self) -> IngestionResult<()> {
        checkpoint(self.cancel)
    }

    /// Coerce and commit one row. `row_num` is the 1-based source row used in errors.
    pub(crate) fn materialize(&mut self, row_num: usize, raw: &RawRow) -> IngestionResult<()> {
        let values = self.coerce_row(row_num, raw)?;
        self.commit(values);
        Ok(())
    }

    fn coerce_row(&self, row_num: usize, raw: &RawRow) -> IngestionResult<Vec<Value>> {
        let mut values = Vec::with_capacity(self.columns.len());
        for col in self.columns {
            let cell = raw.get(&col.name).unwrap_or(&RawValue::Null);
            let Some(lexical) = cell.lexical() else {
                values.push(Value::Null);
                continue;
            };
            let value = coerce(&lexical, &col.hint, &self.rules).map_err(|message| {
                IngestionError::Coercion {
                    row: row_num,
                    field: col.name.clone(),
                    raw: lexical.to_string(),
                    target: col.data_type(),
                    message,
                }
            })?;
            values.push(value);
        }
        Ok(values)
    }

    /// Write a fully coerced row: in place over a placeholder, or appended past the plan.
    fn commit(&mut self, values: Vec<Value>) {
        let index = self.committed;
        if index >= self.table.row_count() {
            self.table.append_placeholder_row();
        }
        self.table.update_row(index, values);
        self.committed += 1;
    }

    pub(crate) fn committed(&self) -> usize {
        self.committed
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &DataSet {
        &self.table
    }

    /// Trim unused preallocated rows and hand over the table.
    pub(crate) fn finish(mut self) -> DataSet {
        let removed = self.plan.trim(&mut self.table, self.committed);
        if removed > 0 {
            log::debug!("trimmed {removed} unused preallocated row(s)");
        }
        self.table
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::ingestion::coerce::Dialect;
    use crate::ingestion::hints::{Converter, TypeHint};
    use crate::types::DataType;

    const RULES: CoercionRules = CoercionRules {
        dialect: Dialect::PostgreSql,
        bool_tokens_as_int: true,
    };

    fn row(cells: &[(&str, RawValue)]) -> RawRow {
        let mut r = RawRow::new();
        for (name, v) in cells {
            r.insert(name.to_string(), v.clone());
        }
        r
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn nulls_skip_coercion_entirely() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let exploding = Converter::new("never", move |_s: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
            Err("converter must not run for nulls".into())
        });
        let columns = vec![
            ColumnDescriptor::new("x", TypeHint::Custom(exploding)),
            ColumnDescriptor::new("y", TypeHint::Int64),
        ];
        let mut m = Materializer::new(&columns, RULES, PreallocationPlan::none(), None).unwrap();
        m.materialize(1, &row(&[("x", RawValue::Null), ("y", text("3"))])).unwrap();
        // A missing field is null too.
        m.materialize(2, &row(&[("y", RawValue::Null)])).unwrap();

        let ds = m.finish();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ds.rows, vec![vec![Value::Null, Value::Int64(3)], vec![Value::Null, Value::Null]]);
        assert_eq!(ds.schema.fields[0].data_type, DataType::Generic("never".into()));
    }

    #[test]
    fn coercion_failure_reports_context_and_commits_nothing() {
        let columns = vec![
            ColumnDescriptor::new("a", TypeHint::Utf8),
            ColumnDescriptor::new("b", TypeHint::Float64),
        ];
        let mut m = Materializer::new(&columns, RULES, PreallocationPlan::none(), None).unwrap();
        let err = m.materialize(4, &row(&[("a", text("ok")), ("b", text("1.2.3"))])).unwrap_err();
        match err {
            IngestionError::Coercion { row, field, raw, target, .. } => {
                assert_eq!((row, field.as_str(), raw.as_str()), (4, "b", "1.2.3"));
                assert_eq!(target, DataType::Float64);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(m.committed(), 0);
        assert_eq!(m.table().row_count(), 0);
    }

    #[test]
    fn commits_past_the_plan_append() {
        let columns = vec![ColumnDescriptor::new("a", TypeHint::Int64)];
        let mut m = Materializer::new(&columns, RULES, PreallocationPlan::with_capacity(1), None).unwrap();
        for (i, v) in ["1", "2", "3"].iter().enumerate() {
            m.materialize(i + 1, &row(&[("a", text(v))])).unwrap();
        }
        let ds = m.finish();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.value(2, "a"), Some(&Value::Int64(3)));
    }

    #[test]
    fn cancellation_before_a_row_leaves_later_rows_uncommitted() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        // Cancels while row 2 is being coerced; row 2 still completes, row 3 never starts.
        let conv = Converter::new("n", move |s: &str| {
            if s == "2" {
                trigger.cancel();
            }
            Ok(Value::Utf8(s.to_string()))
        });
        let columns = vec![ColumnDescriptor::new("a", TypeHint::Custom(conv))];
        let mut m = Materializer::new(&columns, RULES, PreallocationPlan::with_capacity(4), Some(&token)).unwrap();

        let rows: Vec<RawRow> = ["1", "2", "3", "4"].iter().map(|v| row(&[("a", text(v))])).collect();
        let mut result = Ok(());
        for (i, r) in rows.iter().enumerate() {
            if let Err(e) = m.checkpoint().and_then(|_| m.materialize(i + 1, r)) {
                result = Err(e);
                break;
            }
        }

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(m.committed(), 2);
        assert!(m.table().rows[2..].iter().all(|r| r.iter().all(Value::is_null)));
    }
}
