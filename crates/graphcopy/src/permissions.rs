//! Permissions sync.
//!
//! Upserts the `subjects` table from the permissions database into a
//! destination schema while the permission tables are locked against
//! writes.

use graphcopy_sql::TableRef;
use tracing::info;

use crate::copy::{CopyStats, TableCopy, WriteMode, copy_table, effective_batch_size};
use crate::orchestrator::rollback_logged;
use crate::store::{RowSink, RowSource, Transactional};
use crate::{Column, Error, PermissionsConfig};

/// Tables locked on the source for the duration of a sync.
pub const PERMISSION_TABLES: &[&str] = &[
    "subjects",
    "resource_types",
    "resources",
    "permission_levels",
    "permissions",
];

/// A table synced by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    pub table: &'static str,
    /// `(name, type)` pairs, in select and insert order.
    pub columns: &'static [(&'static str, &'static str)],
    /// Conflict key for the upsert.
    pub key: &'static [&'static str],
}

impl Entity {
    pub fn columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|(name, ty)| Column::new(*name, *ty))
            .collect()
    }

    pub fn key(&self) -> Vec<String> {
        self.key.iter().map(|k| k.to_string()).collect()
    }
}

pub const SUBJECTS: Entity = Entity {
    table: "subjects",
    columns: &[
        ("id", "uuid"),
        ("subject_id", "character varying"),
        ("subject_type", "subject_type"),
    ],
    key: &["id"],
};

/// Runs a permissions sync between two open sessions.
pub struct PermissionSync<'a> {
    config: &'a PermissionsConfig,
}

impl<'a> PermissionSync<'a> {
    pub fn new(config: &'a PermissionsConfig) -> Self {
        Self { config }
    }

    /// Lock the permission tables on `source`, upsert every subject into
    /// the destination schema and commit `destination` once.
    ///
    /// Both sessions are rolled back before returning; the source rollback
    /// releases the lock.
    pub async fn run<S, D>(&self, source: &mut S, destination: &mut D) -> Result<CopyStats, Error>
    where
        S: RowSource + Transactional,
        D: RowSink<S::Value> + Transactional,
    {
        let result = self.sync(source, destination).await;
        rollback_logged(destination, "destination").await;
        rollback_logged(source, "source").await;
        result
    }

    async fn sync<S, D>(&self, source: &mut S, destination: &mut D) -> Result<CopyStats, Error>
    where
        S: RowSource + Transactional,
        D: RowSink<S::Value> + Transactional,
    {
        let locked: Vec<TableRef> = PERMISSION_TABLES.iter().map(|t| TableRef::bare(*t)).collect();
        source
            .lock_exclusive(&locked)
            .await
            .map_err(|source| Error::Lock {
                tables: PERMISSION_TABLES.iter().map(|t| t.to_string()).collect(),
                source,
            })?;

        let entity = SUBJECTS;
        let columns = entity.columns();
        let job = TableCopy {
            table: entity.table,
            source: TableRef::bare(entity.table),
            destination: TableRef::qualified(&self.config.destination_schema, entity.table),
            columns: &columns,
            batch_size: effective_batch_size(
                self.config.batch_size,
                columns.len(),
                destination.max_bind_params(),
            ),
            delete_first: false,
            mode: WriteMode::Upsert { keys: entity.key() },
        };
        let stats = copy_table(source, destination, &job).await?;

        destination
            .commit()
            .await
            .map_err(|source| Error::Transaction {
                operation: "commit destination transaction",
                source,
            })?;
        info!(
            schema = %self.config.destination_schema,
            rows = stats.rows,
            "synced {}",
            entity.table
        );

        Ok(stats)
    }
}
