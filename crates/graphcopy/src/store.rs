//! Seams between the copy engine and the databases it talks to.
//!
//! The engine only sees these traits. [`crate::pg`] implements them on top
//! of tokio-postgres transactions; tests implement them in memory.

use async_trait::async_trait;
use graphcopy_sql::TableRef;

use crate::{Column, DbError, ForeignKey};

/// Largest number of bind parameters Postgres accepts in one statement.
pub const POSTGRES_MAX_BIND_PARAMS: usize = 65_535;

/// A row as read from the source, one value per selected column.
pub type Row<V> = Vec<V>;

/// An open transaction that must be finished exactly once.
#[async_trait]
pub trait Transactional: Send {
    async fn commit(&mut self) -> Result<(), DbError>;

    /// Roll back the transaction.
    ///
    /// Calling this on a transaction that was already committed or rolled
    /// back is a no-op and returns `Ok(())`.
    async fn rollback(&mut self) -> Result<(), DbError>;
}

/// Metadata discovery on the source.
#[async_trait]
pub trait Catalog: Send {
    /// Base tables of `schema`, sorted by name.
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, DbError>;

    /// Foreign keys declared on any of `tables` in `schema`.
    async fn list_foreign_keys(
        &mut self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKey>, DbError>;

    /// Insertable columns of `table`, in declaration order.
    async fn list_columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>, DbError>;
}

/// Forward-only row reads on the source.
#[async_trait]
pub trait RowSource: Send {
    /// A single column value, passed through to the destination untouched.
    type Value: Send + Sync + 'static;

    /// State of an open cursor.
    type Cursor: Send + 'static;

    /// Open a cursor selecting `columns`, in that order, from `table`.
    async fn open_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
    ) -> Result<Self::Cursor, DbError>;

    /// Fetch up to `max_rows` rows. An empty result means the cursor is
    /// exhausted.
    async fn fetch_rows(
        &mut self,
        cursor: &mut Self::Cursor,
        max_rows: usize,
    ) -> Result<Vec<Row<Self::Value>>, DbError>;

    /// Take an exclusive lock (concurrent reads only) on `tables` until the
    /// transaction ends.
    async fn lock_exclusive(&mut self, tables: &[TableRef]) -> Result<(), DbError>;
}

/// Writes on the destination.
#[async_trait]
pub trait RowSink<V: Send + Sync + 'static>: Send {
    /// Upper bound on bind parameters per statement.
    fn max_bind_params(&self) -> usize {
        POSTGRES_MAX_BIND_PARAMS
    }

    /// Delete every row of `table`, returning how many were removed.
    async fn delete_all(&mut self, table: &TableRef) -> Result<u64, DbError>;

    /// Insert `rows` with one multi-row statement, returning the number of
    /// rows the destination reports as written.
    async fn insert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        rows: &[Row<V>],
    ) -> Result<u64, DbError>;

    /// Insert `rows`, updating the non-key columns of rows whose `keys`
    /// already exist.
    async fn upsert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        keys: &[String],
        rows: &[Row<V>],
    ) -> Result<u64, DbError>;
}
