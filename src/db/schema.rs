//! Schema introspection.
//!
//! Reads the live catalog of one tenant database: column metadata with
//! primary-key membership, and per-table usage statistics.
//!
//! # Architecture
//!
//! SQL lives in the `queries` submodule. Every query binds schema and table
//! names as parameters; the only interpolated identifier is the table name in
//! `ANALYZE`, and it is validated and quoted first.

use crate::db::executor::StatementExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{LiveColumnInfo, TableUsage};
use crate::validate::{quote_ident, validate_name};
use sqlx::postgres::PgRow;
use sqlx::{Executor, PgPool, Postgres, Row};
use tracing::{debug, info};

/// Schema used when the caller does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Identity table managed outside the engine; never listed.
pub const RESERVED_TABLE: &str = "users";

/// SQLSTATE for a relation that does not exist.
pub(crate) const UNDEFINED_TABLE: &str = "42P01";

/// Catalog reader for a tenant database.
#[derive(Debug, Clone, Copy)]
pub struct SchemaIntrospector {
    executor: StatementExecutor,
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            c.data_type::text AS data_type,
            c.udt_name::text AS udt_name,
            (c.is_nullable = 'YES') AS is_nullable,
            (pk.column_name IS NOT NULL) AS is_primary_key
        FROM information_schema.columns c
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = $1
            AND tc.table_name = $2
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_schema = $1 AND c.table_name = $2
        ORDER BY c.ordinal_position
        "#;

    pub const LIST_BASE_TABLES: &str = r#"
        SELECT t.table_name::text AS table_name
        FROM information_schema.tables t
        WHERE t.table_schema = $1
        AND t.table_type = 'BASE TABLE'
        ORDER BY t.table_name
        "#;

    pub const TABLE_USAGE: &str = r#"
        SELECT
            obj_description(c.oid, 'pg_class') AS description,
            c.reltuples::bigint AS rows_estimated,
            pg_size_pretty(pg_total_relation_size(c.oid)) AS size,
            (
                SELECT count(*)
                FROM information_schema.columns ic
                WHERE ic.table_schema = $1 AND ic.table_name = $2
            ) AS columns_count
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = $1 AND c.relname = $2
        "#;
}

impl SchemaIntrospector {
    pub fn new(executor: StatementExecutor) -> Self {
        Self { executor }
    }

    /// Live columns of `schema.table` in declaration order.
    ///
    /// Fails with `SchemaNotFound` when the table has no visible columns.
    pub async fn get_columns<'c, E>(
        &self,
        conn: E,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<LiveColumnInfo>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        validate_name(schema)?;
        validate_name(table)?;

        let rows = self
            .executor
            .fetch_catalog(conn, queries::DESCRIBE_COLUMNS, &[schema, table])
            .await?;
        if rows.is_empty() {
            return Err(DbError::schema_not_found(schema, table));
        }

        let columns = rows
            .iter()
            .map(parse_column_row)
            .collect::<DbResult<Vec<_>>>()?;
        debug!(schema = %schema, table = %table, columns = columns.len(), "Loaded live columns");
        Ok(columns)
    }

    /// Usage summary for every user table in the default schema.
    ///
    /// Refreshes planner statistics per table before reading them, so this is
    /// meant for on-demand reporting rather than the request path.
    pub async fn get_all_tables_info(&self, pool: &PgPool) -> DbResult<Vec<TableUsage>> {
        let rows = self
            .executor
            .fetch_catalog(pool, queries::LIST_BASE_TABLES, &[DEFAULT_SCHEMA])
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("table_name")?;
            if is_internal_table(&name) {
                continue;
            }
            if validate_name(&name).is_err() {
                // Created outside the engine with a name we cannot safely quote
                debug!(table = %name, "Skipping table with non-standard name");
                continue;
            }

            let analyzed = self
                .executor
                .execute(pool, &format!("ANALYZE {}", quote_ident(&name)))
                .await;
            match analyzed {
                Ok(_) => {}
                Err(err) if err.sql_state() == Some(UNDEFINED_TABLE) => continue,
                Err(err) => return Err(err),
            }

            let usage = self
                .executor
                .fetch_catalog(pool, queries::TABLE_USAGE, &[DEFAULT_SCHEMA, name.as_str()])
                .await?;
            let Some(usage) = usage.first() else {
                // Dropped between listing and analyzing
                continue;
            };

            tables.push(TableUsage {
                description: usage.try_get("description")?,
                rows_estimated: usage.try_get::<Option<i64>, _>("rows_estimated")?.unwrap_or(0),
                size: usage.try_get::<Option<String>, _>("size")?.unwrap_or_default(),
                columns_count: usage.try_get::<Option<i64>, _>("columns_count")?.unwrap_or(0),
                name,
            });
        }

        info!(tables = tables.len(), "Collected table usage");
        Ok(tables)
    }
}

fn parse_column_row(row: &PgRow) -> DbResult<LiveColumnInfo> {
    let name: String = row.try_get("column_name")?;
    let data_type: String = row.try_get("data_type")?;
    let udt_name: String = row.try_get("udt_name")?;
    let is_nullable: bool = row.try_get("is_nullable")?;
    let is_primary: bool = row.try_get("is_primary_key")?;

    Ok(LiveColumnInfo::new(name, data_type, udt_name)
        .with_nullable(is_nullable)
        .with_primary_key(is_primary))
}

/// Tables the usage listing never reports: migration bookkeeping and the identity table.
pub fn is_internal_table(name: &str) -> bool {
    name.contains("migrations") || name == RESERVED_TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_tables_excluded() {
        assert!(is_internal_table("users"));
        assert!(is_internal_table("migrations"));
        assert!(is_internal_table("typeorm_migrations"));
        assert!(is_internal_table("schema_migrations_lock"));
        assert!(!is_internal_table("orders"));
        assert!(!is_internal_table("users_archive"));
        assert!(!is_internal_table("Users"));
    }

    #[test]
    fn test_describe_columns_binds_schema_and_table() {
        assert!(queries::DESCRIBE_COLUMNS.contains("c.table_schema = $1"));
        assert!(queries::DESCRIBE_COLUMNS.contains("c.table_name = $2"));
        assert!(queries::DESCRIBE_COLUMNS.contains("'PRIMARY KEY'"));
        assert!(queries::DESCRIBE_COLUMNS.contains("ORDER BY c.ordinal_position"));
    }

    #[tokio::test]
    async fn test_get_columns_rejects_bad_identifiers_before_querying() {
        let introspector =
            SchemaIntrospector::new(StatementExecutor::new(std::time::Duration::from_secs(1)));
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();

        let err = introspector
            .get_columns(&pool, "public", "orders; DROP TABLE x")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));

        let err = introspector
            .get_columns(&pool, "pg catalog", "orders")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));
    }
}
