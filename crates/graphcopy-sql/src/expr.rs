//! SQL expressions.

use crate::ColumnName;

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The next positional parameter placeholder (`$n` or `?`)
    Param,
    /// A bare column reference
    Column(ColumnName),
    /// `EXCLUDED.column` inside an `ON CONFLICT DO UPDATE` clause
    Excluded(ColumnName),
}

impl Expr {
    pub fn column(name: impl Into<ColumnName>) -> Self {
        Expr::Column(name.into())
    }

    pub fn excluded(name: impl Into<ColumnName>) -> Self {
        Expr::Excluded(name.into())
    }
}
