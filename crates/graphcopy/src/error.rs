use thiserror::Error;

use graphcopy_sql::Placeholders;

use crate::ForeignKey;

/// Error reported by a database collaborator (catalog, cursor, writer).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Other(String),
}

/// Why copying a single table failed.
#[derive(Debug, Error)]
pub enum CopyFailure {
    #[error("table has no insertable columns")]
    NoColumns,

    #[error("failed to clear destination rows: {0}")]
    Delete(#[source] DbError),

    #[error("failed to read source rows: {0}")]
    Read(#[source] DbError),

    #[error("row has {actual} values but {expected} columns were selected")]
    RowWidth { expected: usize, actual: usize },

    #[error("failed to write batch: {0}")]
    Write(#[source] DbError),

    #[error("destination reported {actual} rows written for a batch of {expected}")]
    RowCountMismatch { expected: u64, actual: u64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("metadata discovery failed while trying to {operation}: {source}")]
    Discovery {
        operation: &'static str,
        #[source]
        source: DbError,
    },

    #[error("foreign key {foreign_key} references table '{missing_table}' which is not part of the copied table set")]
    GraphConsistency {
        foreign_key: ForeignKey,
        missing_table: String,
    },

    #[error(
        "tables {} do not form a directed acyclic graph, no copy order exists",
        .tables.join(", ")
    )]
    Cycle { tables: Vec<String> },

    #[error("copying table '{table}' failed at row {offset}: {failure}")]
    Copy {
        table: String,
        offset: u64,
        #[source]
        failure: CopyFailure,
    },

    #[error("could not lock {}: {source}", .tables.join(", "))]
    Lock {
        tables: Vec<String>,
        #[source]
        source: DbError,
    },

    #[error("placeholder style {style:?} is not supported by the destination")]
    UnsupportedPlaceholders { style: Placeholders },

    #[error("failed to {operation}: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: DbError,
    },
}
