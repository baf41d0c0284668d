//! Whole-schema copy.
//!
//! Discovers tables and foreign keys inside the source snapshot, orders the
//! tables, clears the destination, copies every table and commits the
//! destination once. Any failure leaves the destination untouched.

use graphcopy_sql::TableRef;
use tracing::{info, warn};

use crate::copy::{TableCopy, WriteMode, copy_table, effective_batch_size};
use crate::graph::TableGraph;
use crate::store::{Catalog, RowSink, RowSource, Transactional};
use crate::{Column, CopyConfig, CopyFailure, DbError, Error, solver};

/// Outcome of copying one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub name: String,
    /// Tables this one references, sorted by name.
    pub depends_on: Vec<String>,
    pub rows: u64,
    /// Destination rows removed before copying.
    pub deleted: u64,
    pub batches: usize,
    /// Excluded tables are ordered but not copied.
    pub skipped: bool,
}

/// Per-table results, in copy order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub tables: Vec<TableReport>,
}

impl CopyReport {
    pub fn get(&self, table: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.name == table)
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Table names in copy order, skipped tables included.
    pub fn order(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// A table in the copy plan.
struct PlannedTable {
    name: String,
    depends_on: Vec<String>,
    columns: Vec<Column>,
    skipped: bool,
}

/// Runs a schema copy between two open sessions.
pub struct Orchestrator<'a> {
    config: &'a CopyConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a CopyConfig) -> Self {
        Self { config }
    }

    /// Copy every table of the source schema into the destination schema.
    ///
    /// `source` must be a serializable read-only transaction; every metadata
    /// and row query runs inside it. `destination` is committed once, after
    /// the last table. Both sessions are rolled back before returning,
    /// which is a no-op for the committed destination.
    pub async fn run<S, D>(&self, source: &mut S, destination: &mut D) -> Result<CopyReport, Error>
    where
        S: Catalog + RowSource + Transactional,
        D: RowSink<S::Value> + Transactional,
    {
        let result = self.copy_all(source, destination).await;
        rollback_logged(destination, "destination").await;
        rollback_logged(source, "source").await;
        result
    }

    async fn copy_all<S, D>(&self, source: &mut S, destination: &mut D) -> Result<CopyReport, Error>
    where
        S: Catalog + RowSource + Transactional,
        D: RowSink<S::Value> + Transactional,
    {
        let config = self.config;
        info!(
            source_schema = %config.source_schema,
            destination_schema = %config.destination_schema,
            "starting schema copy"
        );

        let plan = self.plan(source).await?;

        // Dependents go first so no foreign key is violated mid-clear.
        let mut cleared = vec![0u64; plan.len()];
        for (i, table) in plan.iter().enumerate().rev() {
            if table.skipped {
                continue;
            }
            cleared[i] = destination
                .delete_all(&self.destination_ref(&table.name))
                .await
                .map_err(|e| Error::Copy {
                    table: table.name.clone(),
                    offset: 0,
                    failure: CopyFailure::Delete(e),
                })?;
        }

        let mut report = CopyReport::default();
        for (table, cleared) in plan.into_iter().zip(cleared) {
            if table.skipped {
                info!("skipping {}", table.name);
                report.tables.push(TableReport {
                    name: table.name,
                    depends_on: table.depends_on,
                    rows: 0,
                    deleted: 0,
                    batches: 0,
                    skipped: true,
                });
                continue;
            }

            let batch_size = effective_batch_size(
                config.batch_size,
                table.columns.len(),
                destination.max_bind_params(),
            );
            let job = TableCopy {
                table: &table.name,
                source: TableRef::qualified(&config.source_schema, &table.name),
                destination: self.destination_ref(&table.name),
                columns: &table.columns,
                batch_size,
                delete_first: true,
                mode: WriteMode::Insert,
            };
            let stats = copy_table(source, destination, &job).await?;
            info!("copied {} rows into {}", stats.rows, table.name);

            report.tables.push(TableReport {
                name: table.name,
                depends_on: table.depends_on,
                rows: stats.rows,
                deleted: cleared + stats.deleted,
                batches: stats.batches,
                skipped: false,
            });
        }

        destination
            .commit()
            .await
            .map_err(|source| Error::Transaction {
                operation: "commit destination transaction",
                source,
            })?;
        info!(
            tables = report.tables.len(),
            rows = report.total_rows(),
            "committed transaction"
        );

        Ok(report)
    }

    /// Discover, order and describe the tables to copy.
    async fn plan<S: Catalog>(&self, source: &mut S) -> Result<Vec<PlannedTable>, Error> {
        let schema = &self.config.source_schema;

        let tables = source
            .list_tables(schema)
            .await
            .map_err(|source| discovery("list tables", source))?;
        let foreign_keys = source
            .list_foreign_keys(schema, &tables)
            .await
            .map_err(|source| discovery("list foreign keys", source))?;

        let graph = TableGraph::build(&tables, &foreign_keys)?;
        let order = solver::order(&graph)?;

        info!("TABLE ORDER");
        let mut plan = Vec::with_capacity(order.len());
        for node in order {
            let name = graph.table(node).to_string();
            let depends_on = graph.dependency_names(node);
            if depends_on.is_empty() {
                info!("{name} has no dependencies");
            } else {
                info!(
                    "{name} depends on {} ({})",
                    depends_on.join(", "),
                    depends_on.len()
                );
            }

            let columns = source
                .list_columns(schema, &name)
                .await
                .map_err(|source| discovery("list columns", source))?;
            for column in &columns {
                info!("    {column}");
            }

            let skipped = self.config.is_excluded(&name);
            if !skipped && columns.is_empty() {
                return Err(Error::Copy {
                    table: name,
                    offset: 0,
                    failure: CopyFailure::NoColumns,
                });
            }

            plan.push(PlannedTable {
                name,
                depends_on,
                columns,
                skipped,
            });
        }

        Ok(plan)
    }

    fn destination_ref(&self, table: &str) -> TableRef {
        TableRef::qualified(&self.config.destination_schema, table)
    }
}

fn discovery(operation: &'static str, source: DbError) -> Error {
    Error::Discovery { operation, source }
}

/// Roll back `session`, logging instead of returning a failure so the
/// caller's own result is never replaced.
pub(crate) async fn rollback_logged<T: Transactional + ?Sized>(session: &mut T, name: &str) {
    if let Err(e) = session.rollback().await {
        warn!(session = name, error = %e, "rollback failed");
    }
}
