//! Preallocation planning.
//!
//! When the final row count is known (declared by the caller) or cheaply countable (a pre-pass
//! over a record stream), the destination table is created with that many placeholder rows and
//! filled in place. Unused placeholders are trimmed from the tail once the source is exhausted.

use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Schema};

use super::cancel::{checkpoint, CancellationToken};

/// Planned table capacity for one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreallocationPlan {
    capacity: Option<usize>,
}

impl PreallocationPlan {
    /// Append rows incrementally, no capacity hint.
    pub fn none() -> Self {
        Self::default()
    }

    /// Preallocate exactly `rows` placeholder rows.
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            capacity: Some(rows),
        }
    }

    /// Plan from an optional caller-declared row count.
    pub fn from_known_count(known: Option<usize>) -> Self {
        Self { capacity: known }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn is_preallocated(&self) -> bool {
        self.capacity.is_some()
    }

    /// Create the destination table according to the plan.
    pub fn new_table(&self, schema: Schema) -> IngestionResult<DataSet> {
        match self.capacity {
            Some(rows) => DataSet::preallocated(schema, rows),
            None => Ok(DataSet::new(schema, Vec::new())),
        }
    }

    /// Remove unused placeholder rows from the end, one at a time, so the table holds exactly
    /// `materialized` rows. Returns how many rows were removed.
    pub fn trim(&self, table: &mut DataSet, materialized: usize) -> usize {
        if !self.is_preallocated() {
            return 0;
        }
        let mut removed = 0;
        while table.row_count() > materialized {
            table.remove_last_row();
            removed += 1;
        }
        removed
    }
}

/// Count top-level JSON objects in `reader` by tracking balanced `{`/`}` outside strings.
///
/// This is a sizing scan only; it does not validate the records. Cancellation is polled before
/// each structural token.
pub fn count_records<R: Read>(reader: R, cancel: Option<&CancellationToken>) -> IngestionResult<usize> {
    let mut depth = 0usize;
    let mut count = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in BufReader::new(reader).bytes() {
        let b = byte?;
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => {
                checkpoint(cancel)?;
                depth += 1;
            }
            b'}' => {
                checkpoint(cancel)?;
                depth = depth.checked_sub(1).ok_or_else(|| {
                    IngestionError::scan(count + 1, "unbalanced '}' while counting records")
                })?;
                if depth == 0 {
                    count += 1;
                }
            }
            b'[' | b']' | b',' | b':' => checkpoint(cancel)?,
            _ => {}
        }
    }
    Ok(count)
}

/// Pre-pass over a seekable record stream: count records, then rewind to where the stream
/// started so decoding sees exactly the same bytes.
pub fn plan_records<R: Read + Seek>(
    reader: &mut R,
    cancel: Option<&CancellationToken>,
) -> IngestionResult<PreallocationPlan> {
    let start = reader.stream_position()?;
    let count = count_records(&mut *reader, cancel)?;
    reader.seek(SeekFrom::Start(start))?;
    log::debug!("record pre-pass counted {count} record(s); preallocating");
    Ok(PreallocationPlan::with_capacity(count))
}
