//! Postgres sessions implementing the store traits.

use async_trait::async_trait;
use graphcopy_sql::{
    DeleteStmt, InsertStmt, LockMode, LockStmt, OnConflict, Placeholders, SelectStmt, TableRef,
    render,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, IsolationLevel, Portal, Transaction};

use super::traced::{TracedTx, TransactionExt};
use super::value::RawValue;
use crate::store::{Row, RowSink, RowSource, Transactional};
use crate::{Column, DbError, Error};

fn finished() -> DbError {
    DbError::Other("transaction already finished".to_string())
}

/// Commit or roll back the transaction in `slot`, leaving it empty.
///
/// Rolling back an empty slot is a no-op. Dropping a filled slot rolls the
/// transaction back as well.
async fn finish(slot: &mut Option<Transaction<'_>>, commit: bool) -> Result<(), DbError> {
    match slot.take() {
        Some(tx) if commit => tx.commit().await.map_err(DbError::from),
        Some(tx) => tx.rollback().await.map_err(DbError::from),
        None if commit => Err(finished()),
        None => Ok(()),
    }
}

fn column_names(columns: &[Column]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}

fn has_always_identity(columns: &[Column]) -> bool {
    columns.iter().any(|c| c.always_identity)
}

/// tokio-postgres only binds `$n` parameters.
pub(crate) fn check_placeholders(style: Placeholders) -> Result<(), Error> {
    match style {
        Placeholders::Dollar => Ok(()),
        other => Err(Error::UnsupportedPlaceholders { style: other }),
    }
}

/// The source side of a session: catalog queries and row reads.
pub struct PgSource<'a> {
    tx: Option<Transaction<'a>>,
}

/// An open read cursor.
pub struct PgCursor {
    portal: Portal,
    exhausted: bool,
}

impl<'a> PgSource<'a> {
    /// Begin a serializable, read-only transaction: every query of the
    /// session sees one snapshot.
    pub async fn snapshot(client: &'a mut Client) -> Result<Self, Error> {
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .read_only(true)
            .start()
            .await
            .map_err(|e| Error::Transaction {
                operation: "begin source transaction",
                source: e.into(),
            })?;
        Ok(Self { tx: Some(tx) })
    }

    /// Begin a read-write transaction. Needed when the session takes
    /// table locks.
    pub async fn locking(client: &'a mut Client) -> Result<Self, Error> {
        let tx = client.transaction().await.map_err(|e| Error::Transaction {
            operation: "begin source transaction",
            source: e.into(),
        })?;
        Ok(Self { tx: Some(tx) })
    }

    pub(super) fn traced(&self) -> Result<TracedTx<'_, 'a>, DbError> {
        self.tx.as_ref().map(|tx| tx.traced()).ok_or_else(finished)
    }
}

#[async_trait]
impl<'a> Transactional for PgSource<'a> {
    async fn commit(&mut self) -> Result<(), DbError> {
        finish(&mut self.tx, true).await
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        finish(&mut self.tx, false).await
    }
}

#[async_trait]
impl<'a> RowSource for PgSource<'a> {
    type Value = RawValue;
    type Cursor = PgCursor;

    async fn open_rows(&mut self, table: &TableRef, columns: &[Column]) -> Result<PgCursor, DbError> {
        let stmt = SelectStmt::new(table.clone()).columns(column_names(columns));
        let rendered = render(&stmt, Placeholders::Dollar);
        let portal = self.traced()?.open_portal(&rendered.sql).await?;
        Ok(PgCursor {
            portal,
            exhausted: false,
        })
    }

    async fn fetch_rows(
        &mut self,
        cursor: &mut PgCursor,
        max_rows: usize,
    ) -> Result<Vec<Row<RawValue>>, DbError> {
        if cursor.exhausted {
            return Ok(Vec::new());
        }
        let limit = i32::try_from(max_rows.max(1)).unwrap_or(i32::MAX);
        let rows = self.traced()?.query_portal(&cursor.portal, limit).await?;
        if rows.len() < limit as usize {
            cursor.exhausted = true;
        }

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.try_get::<_, RawValue>(i).map_err(DbError::from))
                    .collect::<Result<Row<RawValue>, DbError>>()
            })
            .collect()
    }

    async fn lock_exclusive(&mut self, tables: &[TableRef]) -> Result<(), DbError> {
        let stmt = LockStmt::new(tables.iter().cloned(), LockMode::Exclusive);
        let rendered = render(&stmt, Placeholders::Dollar);
        self.traced()?.execute(&rendered.sql, &[]).await?;
        Ok(())
    }
}

/// The destination side of a session: deletes and batched writes.
pub struct PgDestination<'a> {
    tx: Option<Transaction<'a>>,
    placeholders: Placeholders,
}

impl<'a> PgDestination<'a> {
    /// Begin the destination transaction. Fails without touching the
    /// connection if `placeholders` is not a style Postgres accepts.
    pub async fn begin(client: &'a mut Client, placeholders: Placeholders) -> Result<Self, Error> {
        check_placeholders(placeholders)?;
        let tx = client.transaction().await.map_err(|e| Error::Transaction {
            operation: "begin destination transaction",
            source: e.into(),
        })?;
        Ok(Self {
            tx: Some(tx),
            placeholders,
        })
    }

    fn traced(&self) -> Result<TracedTx<'_, 'a>, DbError> {
        self.tx.as_ref().map(|tx| tx.traced()).ok_or_else(finished)
    }

    async fn write(&self, stmt: InsertStmt, rows: &[Row<RawValue>]) -> Result<u64, DbError> {
        let rendered = render(&stmt, self.placeholders);
        let params: Vec<&(dyn ToSql + Sync)> = rows
            .iter()
            .flatten()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect();
        if params.len() != rendered.param_count {
            return Err(DbError::Other(format!(
                "statement has {} placeholders but {} values were bound",
                rendered.param_count,
                params.len()
            )));
        }
        Ok(self.traced()?.execute(&rendered.sql, &params).await?)
    }
}

#[async_trait]
impl<'a> Transactional for PgDestination<'a> {
    async fn commit(&mut self) -> Result<(), DbError> {
        finish(&mut self.tx, true).await
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        finish(&mut self.tx, false).await
    }
}

#[async_trait]
impl<'a> RowSink<RawValue> for PgDestination<'a> {
    async fn delete_all(&mut self, table: &TableRef) -> Result<u64, DbError> {
        let rendered = render(&DeleteStmt::new(table.clone()), self.placeholders);
        Ok(self.traced()?.execute(&rendered.sql, &[]).await?)
    }

    async fn insert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        rows: &[Row<RawValue>],
    ) -> Result<u64, DbError> {
        let stmt = InsertStmt::new(table.clone())
            .columns(column_names(columns))
            .param_rows(rows.len())
            .overriding_system_value(has_always_identity(columns));
        self.write(stmt, rows).await
    }

    async fn upsert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        keys: &[String],
        rows: &[Row<RawValue>],
    ) -> Result<u64, DbError> {
        let names = column_names(columns);
        let stmt = InsertStmt::new(table.clone())
            .columns(names.clone())
            .param_rows(rows.len())
            .overriding_system_value(has_always_identity(columns))
            .on_conflict(OnConflict::update_others(keys, &names));
        self.write(stmt, rows).await
    }
}
