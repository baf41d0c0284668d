//! Render SQL AST to string.

use std::cell::Cell;
use std::fmt;

use crate::expr::Expr;
use crate::stmt::*;
use crate::{Ident, Placeholders, RenderedSql};

/// Rendering context that hands out parameter placeholders.
///
/// Uses interior mutability (`Cell`) so that `Render::render` can take `&self`,
/// enabling the `Fmt` wrapper to implement `Display`.
pub struct RenderContext {
    style: Placeholders,
    /// Number of placeholders emitted so far.
    params: Cell<usize>,
}

impl RenderContext {
    pub fn new(style: Placeholders) -> Self {
        Self {
            style,
            params: Cell::new(0),
        }
    }

    /// Claim the next placeholder index (1-based).
    fn next_param(&self) -> usize {
        let idx = self.params.get() + 1;
        self.params.set(idx);
        idx
    }

    fn param_count(&self) -> usize {
        self.params.get()
    }
}

/// Wrapper for rendering a `Render` type via `Display`.
///
/// Allows using `write!(f, "{}", Fmt(ctx, &expr))` in format strings.
pub struct Fmt<'a, T: Render>(
    /// The rendering context for parameter tracking.
    &'a RenderContext,
    /// The value to render.
    &'a T,
);

impl<T: Render> fmt::Display for Fmt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.1.render(self.0, f)
    }
}

// ============================================================================
// Render implementations
// ============================================================================

/// Trait for types that can be rendered to SQL.
pub trait Render {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Render for Expr {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param => {
                let idx = ctx.next_param();
                match ctx.style {
                    Placeholders::Dollar => write!(f, "${idx}"),
                    Placeholders::Question => write!(f, "?"),
                }
            }
            Expr::Column(name) => write!(f, "{}", Ident(name)),
            Expr::Excluded(name) => write!(f, "EXCLUDED.{}", Ident(name)),
        }
    }
}

fn write_idents(f: &mut fmt::Formatter<'_>, names: &[String]) -> fmt::Result {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", Ident(name))?;
    }
    Ok(())
}

impl Render for SelectStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT")?;

        if self.columns.is_empty() {
            write!(f, " *")?;
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {}", Fmt(ctx, col))?;
            }
        }

        write!(f, "\nFROM {}", self.from)
    }
}

impl Render for InsertStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {} (", self.table)?;
        write_idents(f, &self.columns)?;
        write!(f, ")")?;

        if self.overriding_system_value {
            write!(f, "\nOVERRIDING SYSTEM VALUE")?;
        }

        // VALUES (...), (...)
        write!(f, "\nVALUES ")?;
        for (r, row) in self.rows.iter().enumerate() {
            if r > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            for (i, val) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", Fmt(ctx, val))?;
            }
            write!(f, ")")?;
        }

        // ON CONFLICT
        if let Some(conflict) = &self.on_conflict {
            write!(f, "\nON CONFLICT (")?;
            write_idents(f, &conflict.columns)?;
            write!(f, ")")?;

            match &conflict.action {
                ConflictAction::DoNothing => {
                    write!(f, " DO NOTHING")?;
                }
                ConflictAction::DoUpdate(assignments) => {
                    write!(f, " DO UPDATE SET ")?;
                    for (i, assign) in assignments.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        let col = Ident(assign.column.as_str());
                        let val = Fmt(ctx, &assign.value);
                        write!(f, "{col} = {val}")?;
                    }
                }
            }
        }

        Ok(())
    }
}

impl Render for DeleteStmt {
    fn render(&self, _ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)
    }
}

impl Render for LockStmt {
    fn render(&self, _ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LOCK TABLE ")?;
        for (i, table) in self.tables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{table}")?;
        }
        write!(f, " IN {} MODE", self.mode.as_str())
    }
}

// ============================================================================
// Convenience methods
// ============================================================================

/// Render a statement to SQL with the given placeholder style.
pub fn render(stmt: &impl Render, style: Placeholders) -> RenderedSql {
    let ctx = RenderContext::new(style);
    let sql = format!("{}", Fmt(&ctx, stmt));
    RenderedSql {
        sql,
        param_count: ctx.param_count(),
    }
}

#[cfg(test)]
mod tests;
