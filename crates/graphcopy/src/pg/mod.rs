//! Postgres implementation of the store traits.
//!
//! Values travel in binary wire format ([`RawValue`]), so source and
//! destination columns must have identical types. Arrays of user-defined
//! types embed type OIDs and only transfer between databases where those
//! OIDs match.

mod catalog;
mod session;
mod traced;
mod value;

use tokio_postgres::Client;

pub use session::{PgCursor, PgDestination, PgSource};
pub use traced::{TracedTx, TransactionExt};
pub use value::RawValue;

use crate::copy::CopyStats;
use crate::{CopyConfig, CopyReport, Error, Orchestrator, PermissionSync, PermissionsConfig};

/// Copy `config.source_schema` on `source` into
/// `config.destination_schema` on `destination`.
///
/// The source is read inside one serializable read-only transaction; the
/// destination is written inside one transaction committed at the end.
/// An unsupported placeholder style is rejected before either connection is
/// used.
pub async fn copy_schema(
    source: &mut Client,
    destination: &mut Client,
    config: &CopyConfig,
) -> Result<CopyReport, Error> {
    session::check_placeholders(config.placeholders)?;
    let mut source = PgSource::snapshot(source).await?;
    let mut destination = PgDestination::begin(destination, config.placeholders).await?;
    Orchestrator::new(config)
        .run(&mut source, &mut destination)
        .await
}

/// Upsert the permission subjects from `source` into
/// `config.destination_schema` on `destination`.
pub async fn sync_permissions(
    source: &mut Client,
    destination: &mut Client,
    config: &PermissionsConfig,
) -> Result<CopyStats, Error> {
    let mut source = PgSource::locking(source).await?;
    let mut destination =
        PgDestination::begin(destination, graphcopy_sql::Placeholders::Dollar).await?;
    PermissionSync::new(config)
        .run(&mut source, &mut destination)
        .await
}
