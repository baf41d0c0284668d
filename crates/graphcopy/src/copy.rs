//! Batch copy engine.
//!
//! Streams one table from a [`RowSource`] cursor into a [`RowSink`], one
//! multi-row statement per batch.

use graphcopy_sql::TableRef;
use tracing::{debug, warn};

use crate::store::{Row, RowSink, RowSource};
use crate::{Column, CopyFailure, Error};

/// Batch size used when the caller does not ask for one.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Pick a batch size whose bind-parameter count fits the destination.
///
/// Starts from `requested` (or [`DEFAULT_BATCH_SIZE`]) and clamps it so that
/// `batch_size * column_count <= max_params`. Never returns less than 1.
pub fn effective_batch_size(
    requested: Option<usize>,
    column_count: usize,
    max_params: usize,
) -> usize {
    let wanted = requested.unwrap_or(DEFAULT_BATCH_SIZE).max(1);
    let ceiling = (max_params / column_count.max(1)).max(1);

    if wanted > ceiling {
        if requested.is_some() {
            warn!(
                requested = wanted,
                ceiling, column_count, "batch size exceeds bind parameter limit, clamping"
            );
        }
        ceiling
    } else {
        wanted
    }
}

/// How batches are written to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain multi-row insert.
    Insert,
    /// Insert, updating every non-key column on key conflicts.
    Upsert { keys: Vec<String> },
}

/// Everything needed to copy one table.
#[derive(Debug, Clone)]
pub struct TableCopy<'a> {
    /// Name used in errors and logs.
    pub table: &'a str,
    pub source: TableRef,
    pub destination: TableRef,
    /// Columns to select and insert, in this exact order.
    pub columns: &'a [Column],
    pub batch_size: usize,
    /// Delete all destination rows before inserting.
    pub delete_first: bool,
    pub mode: WriteMode,
}

/// Outcome of copying one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Rows read from the source and written to the destination.
    pub rows: u64,
    /// Rows removed from the destination by the delete-first step.
    pub deleted: u64,
    /// Statements issued to write the rows.
    pub batches: usize,
}

/// Copy one table in batches of `job.batch_size` rows.
///
/// The returned row count equals the number of rows read from the source.
/// Any read or write failure aborts the copy; nothing is retried.
pub async fn copy_table<S, D>(
    source: &mut S,
    destination: &mut D,
    job: &TableCopy<'_>,
) -> Result<CopyStats, Error>
where
    S: RowSource,
    D: RowSink<S::Value>,
{
    let fail = |offset: u64, failure: CopyFailure| Error::Copy {
        table: job.table.to_string(),
        offset,
        failure,
    };

    if job.columns.is_empty() {
        return Err(fail(0, CopyFailure::NoColumns));
    }

    let batch_size = job.batch_size.max(1);
    let mut stats = CopyStats::default();

    if job.delete_first {
        let deleted = destination.delete_all(&job.destination).await;
        stats.deleted = deleted.map_err(|e| fail(0, CopyFailure::Delete(e)))?;
        debug!(table = job.table, deleted = stats.deleted, "cleared destination table");
    }

    let mut cursor = source
        .open_rows(&job.source, job.columns)
        .await
        .map_err(|e| fail(0, CopyFailure::Read(e)))?;

    let mut batch: Vec<Row<S::Value>> = Vec::with_capacity(batch_size);
    let mut read: u64 = 0;

    loop {
        let rows = source
            .fetch_rows(&mut cursor, batch_size)
            .await
            .map_err(|e| fail(read, CopyFailure::Read(e)))?;
        if rows.is_empty() {
            break;
        }

        for row in rows {
            if row.len() != job.columns.len() {
                return Err(fail(
                    read,
                    CopyFailure::RowWidth {
                        expected: job.columns.len(),
                        actual: row.len(),
                    },
                ));
            }
            read += 1;
            batch.push(row);

            if batch.len() == batch_size {
                flush(destination, job, &mut batch, &mut stats).await?;
            }
        }
    }

    if !batch.is_empty() {
        flush(destination, job, &mut batch, &mut stats).await?;
    }

    debug_assert_eq!(read, stats.rows);
    Ok(stats)
}

/// Write the buffered rows as one statement and clear the buffer.
async fn flush<V, D>(
    destination: &mut D,
    job: &TableCopy<'_>,
    batch: &mut Vec<Row<V>>,
    stats: &mut CopyStats,
) -> Result<(), Error>
where
    V: Send + Sync + 'static,
    D: RowSink<V>,
{
    let offset = stats.rows;
    let fail = |failure: CopyFailure| Error::Copy {
        table: job.table.to_string(),
        offset,
        failure,
    };

    let written = match &job.mode {
        WriteMode::Insert => {
            destination
                .insert_rows(&job.destination, job.columns, batch)
                .await
        }
        WriteMode::Upsert { keys } => {
            destination
                .upsert_rows(&job.destination, job.columns, keys, batch)
                .await
        }
    }
    .map_err(|e| fail(CopyFailure::Write(e)))?;

    let expected = batch.len() as u64;
    if written != expected {
        return Err(fail(CopyFailure::RowCountMismatch {
            expected,
            actual: written,
        }));
    }

    stats.rows += written;
    stats.batches += 1;
    debug!(
        table = job.table,
        batch = stats.batches,
        rows = written,
        total = stats.rows,
        "flushed batch"
    );
    batch.clear();
    Ok(())
}
