//! SQL statements.

use crate::expr::Expr;
use crate::{ColumnName, TableRef};

/// A SELECT statement over a single table.
#[derive(Debug, Clone)]
pub struct SelectStmt {
    pub columns: Vec<Expr>,
    pub from: TableRef,
}

// ============================================================================
// INSERT statement
// ============================================================================

/// A multi-row INSERT statement.
///
/// Every entry of `rows` must have exactly one expression per column.
#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub table: TableRef,
    pub columns: Vec<ColumnName>,
    pub rows: Vec<Vec<Expr>>,
    /// Render `OVERRIDING SYSTEM VALUE`, required to write explicit values
    /// into `GENERATED ALWAYS` identity columns.
    pub overriding_system_value: bool,
    pub on_conflict: Option<OnConflict>,
}

/// ON CONFLICT clause for upsert.
#[derive(Debug, Clone)]
pub struct OnConflict {
    /// Conflict target columns
    pub columns: Vec<ColumnName>,
    /// What to do on conflict
    pub action: ConflictAction,
}

impl OnConflict {
    /// `ON CONFLICT (keys) DO UPDATE SET c = EXCLUDED.c` for every column
    /// that is not part of the conflict key.
    pub fn update_others(keys: &[ColumnName], columns: &[ColumnName]) -> Self {
        let assignments: Vec<UpdateAssignment> = columns
            .iter()
            .filter(|c| !keys.contains(c))
            .map(|c| UpdateAssignment::new(c.clone(), Expr::excluded(c.clone())))
            .collect();

        let action = if assignments.is_empty() {
            ConflictAction::DoNothing
        } else {
            ConflictAction::DoUpdate(assignments)
        };

        Self {
            columns: keys.to_vec(),
            action,
        }
    }
}

/// What to do on conflict.
#[derive(Debug, Clone)]
pub enum ConflictAction {
    /// DO NOTHING
    DoNothing,
    /// DO UPDATE SET ...
    DoUpdate(Vec<UpdateAssignment>),
}

/// An assignment in ON CONFLICT DO UPDATE SET.
#[derive(Debug, Clone)]
pub struct UpdateAssignment {
    pub column: ColumnName,
    pub value: Expr,
}

impl UpdateAssignment {
    pub fn new(column: ColumnName, value: Expr) -> Self {
        Self { column, value }
    }
}

// ============================================================================
// DELETE statement
// ============================================================================

/// An unconditional DELETE statement.
#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub table: TableRef,
}

// ============================================================================
// LOCK statement
// ============================================================================

/// `LOCK TABLE a, b IN <mode> MODE`.
#[derive(Debug, Clone)]
pub struct LockStmt {
    pub tables: Vec<TableRef>,
    pub mode: LockMode,
}

/// Table lock modes used by graphcopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Allows concurrent reads only.
    Exclusive,
}

impl LockMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::Exclusive => "EXCLUSIVE",
        }
    }
}

// ============================================================================
// Builder-style constructors
// ============================================================================

impl SelectStmt {
    pub fn new(from: TableRef) -> Self {
        Self {
            columns: Vec::new(),
            from,
        }
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<ColumnName>>) -> Self {
        self.columns.extend(cols.into_iter().map(Expr::column));
        self
    }
}

impl InsertStmt {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
            rows: Vec::new(),
            overriding_system_value: false,
            on_conflict: None,
        }
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<ColumnName>>) -> Self {
        self.columns.extend(cols.into_iter().map(Into::into));
        self
    }

    pub fn row(mut self, values: Vec<Expr>) -> Self {
        self.rows.push(values);
        self
    }

    /// Append `count` rows made entirely of parameter placeholders.
    pub fn param_rows(mut self, count: usize) -> Self {
        let width = self.columns.len();
        self.rows.extend((0..count).map(|_| vec![Expr::Param; width]));
        self
    }

    pub fn overriding_system_value(mut self, overriding: bool) -> Self {
        self.overriding_system_value = overriding;
        self
    }

    pub fn on_conflict(mut self, conflict: OnConflict) -> Self {
        self.on_conflict = Some(conflict);
        self
    }
}

impl DeleteStmt {
    pub fn new(table: TableRef) -> Self {
        Self { table }
    }
}

impl LockStmt {
    pub fn new(tables: impl IntoIterator<Item = TableRef>, mode: LockMode) -> Self {
        Self {
            tables: tables.into_iter().collect(),
            mode,
        }
    }
}
