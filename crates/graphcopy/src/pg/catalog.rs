//! Metadata discovery through `information_schema` and `pg_constraint`.
//!
//! `information_schema` columns use domain types (`sql_identifier`,
//! `character_data`), so every selected value is cast to `text`.

use async_trait::async_trait;

use super::session::PgSource;
use crate::store::Catalog;
use crate::{Column, DbError, ForeignKey};

const LIST_TABLES: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema::text = $1
  AND table_type::text = 'BASE TABLE'
ORDER BY table_name::text";

/// One row per column pair of every foreign key declared on the listed
/// tables. Constraint names are only unique per table, so keys are read from
/// `pg_constraint` by relation oid. A referenced table in another schema is
/// reported schema-qualified.
const LIST_FOREIGN_KEYS: &str = "\
SELECT src.relname::text,
       src_col.attname::text,
       CASE WHEN dst_ns.oid = src_ns.oid THEN dst.relname::text
            ELSE dst_ns.nspname::text || '.' || dst.relname::text END,
       dst_col.attname::text
FROM pg_constraint AS c
JOIN pg_class AS src ON src.oid = c.conrelid
JOIN pg_namespace AS src_ns ON src_ns.oid = src.relnamespace
JOIN pg_class AS dst ON dst.oid = c.confrelid
JOIN pg_namespace AS dst_ns ON dst_ns.oid = dst.relnamespace
CROSS JOIN LATERAL unnest(c.conkey, c.confkey) AS k(src_attnum, dst_attnum)
JOIN pg_attribute AS src_col ON src_col.attrelid = c.conrelid AND src_col.attnum = k.src_attnum
JOIN pg_attribute AS dst_col ON dst_col.attrelid = c.confrelid AND dst_col.attnum = k.dst_attnum
WHERE c.contype = 'f'
  AND src_ns.nspname::text = $1
  AND src.relname::text = ANY($2::text[])
ORDER BY src.relname::text, c.conname::text, src_col.attname::text";

const LIST_COLUMNS: &str = "\
SELECT column_name::text,
       data_type::text,
       is_identity::text = 'YES' AND COALESCE(identity_generation::text, '') = 'ALWAYS'
FROM information_schema.columns
WHERE table_schema::text = $1
  AND table_name::text = $2
  AND is_generated::text = 'NEVER'
ORDER BY ordinal_position";

#[async_trait]
impl<'a> Catalog for PgSource<'a> {
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, DbError> {
        let rows = self.traced()?.query(LIST_TABLES, &[&schema]).await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(DbError::from))
            .collect()
    }

    async fn list_foreign_keys(
        &mut self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKey>, DbError> {
        if tables.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .traced()?
            .query(LIST_FOREIGN_KEYS, &[&schema, &tables])
            .await?;
        rows.iter()
            .map(|row| -> Result<ForeignKey, DbError> {
                Ok(ForeignKey::new(
                    row.try_get::<_, String>(0)?,
                    row.try_get::<_, String>(1)?,
                    row.try_get::<_, String>(2)?,
                    row.try_get::<_, String>(3)?,
                ))
            })
            .collect()
    }

    async fn list_columns(&mut self, schema: &str, table: &str) -> Result<Vec<Column>, DbError> {
        let rows = self.traced()?.query(LIST_COLUMNS, &[&schema, &table]).await?;
        rows.iter()
            .map(|row| -> Result<Column, DbError> {
                let column = Column::new(
                    row.try_get::<_, String>(0)?,
                    row.try_get::<_, String>(1)?,
                );
                Ok(if row.try_get::<_, bool>(2)? {
                    column.always_identity()
                } else {
                    column
                })
            })
            .collect()
    }
}
