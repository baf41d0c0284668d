//! Dependency-ordered, batched table copy between Postgres schemas.
//!
//! This crate provides:
//! - A dependency graph over tables built from foreign keys
//! - A deterministic copy order (parents before children)
//! - A batch copy engine streaming rows through bounded multi-row inserts
//! - A schema copy that commits the destination exactly once
//! - A permissions sync that upserts `subjects` under a table lock
//!
//! The engine talks to databases through the traits in [`store`]. The
//! [`pg`] module implements them on top of tokio-postgres:
//!
//! ```ignore
//! let config = CopyConfig::new("staging").batch_size(5_000);
//! let report = graphcopy::pg::copy_schema(&mut source, &mut destination, &config).await?;
//! println!("copied {} rows", report.total_rows());
//! ```
//!
//! # Ordering
//!
//! A foreign key from `post.author_id` to `user.id` makes `post` depend on
//! `user`, so `user` is copied first. Tables with no relative constraint are
//! copied in name order. Cycles, including self-references, are rejected.

pub mod config;
pub mod copy;
mod error;
pub mod graph;
pub mod orchestrator;
pub mod permissions;
pub mod pg;
mod schema;
pub mod solver;
pub mod store;

#[cfg(test)]
mod memory;

pub use config::{CopyConfig, PermissionsConfig};
pub use copy::{CopyStats, TableCopy, WriteMode, copy_table, effective_batch_size};
pub use error::{CopyFailure, DbError, Error};
pub use graph::{NodeId, TableArena, TableGraph};
pub use orchestrator::{CopyReport, Orchestrator, TableReport};
pub use permissions::{PERMISSION_TABLES, PermissionSync, SUBJECTS};
pub use schema::{Column, ForeignKey};

pub use graphcopy_sql::{Placeholders, TableRef};

pub type Result<T> = std::result::Result<T, Error>;
