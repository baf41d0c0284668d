//! In-memory sessions for unit tests.
//!
//! Values are plain `i64`s. Row `i` of a table holds `i * 100 + j` in
//! column `j`, so the first column doubles as a unique key.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use graphcopy_sql::TableRef;

use crate::store::{Catalog, POSTGRES_MAX_BIND_PARAMS, Row, RowSink, RowSource, Transactional};
use crate::{Column, DbError, ForeignKey};

fn injected(what: &str) -> DbError {
    DbError::Other(format!("injected {what} failure"))
}

/// State shared by both fakes: has the transaction been finished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    #[default]
    Open,
    Committed,
    RolledBack,
}

// ==================== Source ====================

#[derive(Debug, Clone)]
struct SourceTable {
    columns: Vec<Column>,
    rows: Vec<Row<i64>>,
}

#[derive(Debug, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, SourceTable>,
    foreign_keys: Vec<ForeignKey>,
    failing_reads: BTreeSet<String>,
    fail_discovery: bool,
    fail_lock: bool,
    pub locked: Vec<TableRef>,
    pub state: TxState,
}

pub struct MemoryCursor {
    table: String,
    next: usize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with `rows` generated rows.
    pub fn with_table(mut self, name: &str, columns: Vec<Column>, rows: usize) -> Self {
        let width = columns.len() as i64;
        let rows = (0..rows as i64)
            .map(|i| (0..width).map(|j| i * 100 + j).collect::<Row<i64>>())
            .collect();
        self.tables
            .insert(name.to_string(), SourceTable { columns, rows });
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn fail_reads_of(mut self, table: &str) -> Self {
        self.failing_reads.insert(table.to_string());
        self
    }

    pub fn fail_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub fn fail_lock(mut self) -> Self {
        self.fail_lock = true;
        self
    }
}

#[async_trait]
impl Transactional for MemorySource {
    async fn commit(&mut self) -> Result<(), DbError> {
        self.state = TxState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        if self.state == TxState::Open {
            self.state = TxState::RolledBack;
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for MemorySource {
    async fn list_tables(&mut self, _schema: &str) -> Result<Vec<String>, DbError> {
        if self.fail_discovery {
            return Err(injected("discovery"));
        }
        Ok(self.tables.keys().cloned().collect())
    }

    async fn list_foreign_keys(
        &mut self,
        _schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKey>, DbError> {
        Ok(self
            .foreign_keys
            .iter()
            .filter(|fk| tables.contains(&fk.from_table))
            .cloned()
            .collect())
    }

    async fn list_columns(&mut self, _schema: &str, table: &str) -> Result<Vec<Column>, DbError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RowSource for MemorySource {
    type Value = i64;
    type Cursor = MemoryCursor;

    async fn open_rows(
        &mut self,
        table: &TableRef,
        _columns: &[Column],
    ) -> Result<MemoryCursor, DbError> {
        if !self.tables.contains_key(&table.name) {
            return Err(DbError::Other(format!("relation {table} does not exist")));
        }
        Ok(MemoryCursor {
            table: table.name.clone(),
            next: 0,
        })
    }

    async fn fetch_rows(
        &mut self,
        cursor: &mut MemoryCursor,
        max_rows: usize,
    ) -> Result<Vec<Row<i64>>, DbError> {
        if self.failing_reads.contains(&cursor.table) {
            return Err(injected("read"));
        }
        let rows = &self.tables[&cursor.table].rows;
        let end = (cursor.next + max_rows).min(rows.len());
        let chunk = rows[cursor.next..end].to_vec();
        cursor.next = end;
        Ok(chunk)
    }

    async fn lock_exclusive(&mut self, tables: &[TableRef]) -> Result<(), DbError> {
        if self.fail_lock {
            return Err(injected("lock"));
        }
        self.locked.extend_from_slice(tables);
        Ok(())
    }
}

// ==================== Destination ====================

#[derive(Debug, Default)]
pub struct MemoryDestination {
    committed: BTreeMap<String, Vec<Row<i64>>>,
    pending: BTreeMap<String, Vec<Row<i64>>>,
    insert_sizes: BTreeMap<String, Vec<usize>>,
    rows_before_first_insert: BTreeMap<String, usize>,
    fail_insert_after: BTreeMap<String, usize>,
    drop_one_row: bool,
    max_bind_params: Option<usize>,
    /// Tables passed to `delete_all`, in call order.
    pub deletes: Vec<String>,
    pub commits: usize,
    pub state: TxState,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `rows` rows that already exist before the run.
    pub fn with_existing(mut self, table: &str, rows: usize) -> Self {
        let existing: Vec<Row<i64>> = (0..rows as i64).map(|i| vec![-1 - i]).collect();
        self.committed.insert(table.to_string(), existing.clone());
        self.pending.insert(table.to_string(), existing);
        self
    }

    /// Let the first `calls` inserts into `table` succeed, then fail.
    pub fn fail_insert_after(mut self, table: &str, calls: usize) -> Self {
        self.fail_insert_after.insert(table.to_string(), calls);
        self
    }

    /// Report one row fewer than requested for every insert.
    pub fn drop_one_row_per_insert(mut self) -> Self {
        self.drop_one_row = true;
        self
    }

    pub fn with_max_bind_params(mut self, max: usize) -> Self {
        self.max_bind_params = Some(max);
        self
    }

    pub fn insert_sizes(&self, table: &str) -> Vec<usize> {
        self.insert_sizes.get(table).cloned().unwrap_or_default()
    }

    /// Rows visible inside the open transaction.
    pub fn pending_rows(&self, table: &str) -> usize {
        self.pending.get(table).map_or(0, Vec::len)
    }

    /// Rows visible to other sessions.
    pub fn committed_rows(&self, table: &str) -> usize {
        self.committed.get(table).map_or(0, Vec::len)
    }

    pub fn committed_table(&self, table: &str) -> Vec<Row<i64>> {
        self.committed.get(table).cloned().unwrap_or_default()
    }

    pub fn rows_before_first_insert(&self, table: &str) -> Option<usize> {
        self.rows_before_first_insert.get(table).copied()
    }

    fn check_insert(&mut self, table: &TableRef, rows: usize) -> Result<(), DbError> {
        if self.state != TxState::Open {
            return Err(DbError::Other("transaction is finished".to_string()));
        }
        let calls = self.insert_sizes.entry(table.name.clone()).or_default();
        if let Some(limit) = self.fail_insert_after.get(&table.name) {
            if calls.len() >= *limit {
                return Err(injected("insert"));
            }
        }
        calls.push(rows);
        let existing = self.pending.get(&table.name).map_or(0, Vec::len);
        self.rows_before_first_insert
            .entry(table.name.clone())
            .or_insert(existing);
        Ok(())
    }

    fn written(&self, rows: usize) -> u64 {
        if self.drop_one_row {
            rows.saturating_sub(1) as u64
        } else {
            rows as u64
        }
    }
}

#[async_trait]
impl Transactional for MemoryDestination {
    async fn commit(&mut self) -> Result<(), DbError> {
        self.committed = self.pending.clone();
        self.commits += 1;
        self.state = TxState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        if self.state == TxState::Open {
            self.pending = self.committed.clone();
            self.state = TxState::RolledBack;
        }
        Ok(())
    }
}

#[async_trait]
impl RowSink<i64> for MemoryDestination {
    fn max_bind_params(&self) -> usize {
        self.max_bind_params.unwrap_or(POSTGRES_MAX_BIND_PARAMS)
    }

    async fn delete_all(&mut self, table: &TableRef) -> Result<u64, DbError> {
        self.deletes.push(table.name.clone());
        let removed = self.pending.remove(&table.name).map_or(0, |rows| rows.len());
        Ok(removed as u64)
    }

    async fn insert_rows(
        &mut self,
        table: &TableRef,
        _columns: &[Column],
        rows: &[Row<i64>],
    ) -> Result<u64, DbError> {
        self.check_insert(table, rows.len())?;
        self.pending
            .entry(table.name.clone())
            .or_default()
            .extend_from_slice(rows);
        Ok(self.written(rows.len()))
    }

    async fn upsert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        keys: &[String],
        rows: &[Row<i64>],
    ) -> Result<u64, DbError> {
        self.check_insert(table, rows.len())?;
        let key = keys
            .first()
            .and_then(|k| columns.iter().position(|c| &c.name == k))
            .ok_or_else(|| DbError::Other("conflict key is not a selected column".to_string()))?;

        let stored = self.pending.entry(table.name.clone()).or_default();
        for row in rows {
            match stored.iter_mut().find(|r| r.get(key) == row.get(key)) {
                Some(existing) => existing.clone_from(row),
                None => stored.push(row.clone()),
            }
        }
        Ok(self.written(rows.len()))
    }
}
