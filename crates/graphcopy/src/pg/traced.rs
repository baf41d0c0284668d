//! Traced transaction wrapper.
//!
//! Wraps a tokio-postgres transaction and logs every statement via tracing.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Error, Portal, Row, Transaction};
use tracing::Instrument;

/// A thin wrapper that delegates to the transaction but adds a
/// `tracing::debug_span!` around each call.
pub struct TracedTx<'t, 'a> {
    tx: &'t Transaction<'a>,
}

impl<'t, 'a> TracedTx<'t, 'a> {
    pub fn new(tx: &'t Transaction<'a>) -> Self {
        Self { tx }
    }

    /// Execute a statement, returning the number of rows affected.
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, Error> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            params = params.len(),
            affected = tracing::field::Empty,
        );
        let affected = self
            .tx
            .execute(sql, params)
            .instrument(span.clone())
            .await?;
        span.record("affected", affected);
        Ok(affected)
    }

    /// Execute a query, returning all rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let rows = self.tx.query(sql, params).instrument(span.clone()).await?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Prepare `sql` and bind it to a portal that can be read in chunks.
    pub async fn open_portal(&self, sql: &str) -> Result<Portal, Error> {
        let span = tracing::debug_span!("db.portal", sql = %sql);
        async {
            let stmt = self.tx.prepare(sql).await?;
            self.tx.bind(&stmt, &[]).await
        }
        .instrument(span)
        .await
    }

    /// Read up to `max_rows` rows from `portal`.
    pub async fn query_portal(&self, portal: &Portal, max_rows: i32) -> Result<Vec<Row>, Error> {
        let span = tracing::debug_span!(
            "db.fetch",
            max_rows,
            rows = tracing::field::Empty,
        );
        let rows = self
            .tx
            .query_portal(portal, max_rows)
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());
        Ok(rows)
    }
}

/// Extension trait to get a traced wrapper from a transaction.
pub trait TransactionExt<'a> {
    /// Wrap this transaction in a `TracedTx` for statement logging.
    fn traced(&self) -> TracedTx<'_, 'a>;
}

impl<'a> TransactionExt<'a> for Transaction<'a> {
    fn traced(&self) -> TracedTx<'_, 'a> {
        TracedTx::new(self)
    }
}
