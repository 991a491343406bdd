//! Schema mutation: create table, add/drop/rename column, alter column type.
//!
//! Statement text is assembled from identifiers and types that have already
//! passed [`crate::validate`]; nothing else is ever concatenated in, except
//! default literals, which go through [`render_default`].
//!
//! # Atomicity
//!
//! `add_column` runs its existence checks and `ALTER`s inside one transaction
//! after taking an exclusive lock on the table, so "check, then add" cannot
//! interleave with another DDL call on the same table. Every other operation is
//! a single autocommit statement (create-with-comment uses a short transaction).

use crate::db::executor::StatementExecutor;
use crate::db::schema::{DEFAULT_SCHEMA, UNDEFINED_TABLE};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, TableDescriptor};
use crate::validate::{quote_ident, quote_literal, validate_name, validate_type};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};

mod queries {
    pub const COLUMN_EXISTS: &str = r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
        )
        "#;

    pub const PRIMARY_KEY_EXISTS: &str = r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.table_constraints
            WHERE table_schema = $1 AND table_name = $2 AND constraint_type = 'PRIMARY KEY'
        )
        "#;
}

// =============================================================================
// Default Literals
// =============================================================================

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("number regex")
});

static FUNCTION_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?\([A-Za-z0-9_ ,.']*\)$")
        .expect("function call regex")
});

/// How a raw default value is written into a column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultLiteral {
    /// Numeric literal, emitted as-is
    Number,
    /// `true`, `false` or `null`, emitted in lower case
    Keyword,
    /// Call-like expression such as `now()` or `nextval('seq')`, emitted as-is
    FunctionCall,
    /// Anything else, emitted as a quoted string literal
    Quoted,
}

impl DefaultLiteral {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NUMBER_RE.is_match(trimmed) {
            Self::Number
        } else if ["true", "false", "null"]
            .iter()
            .any(|kw| trimmed.eq_ignore_ascii_case(kw))
        {
            Self::Keyword
        } else if FUNCTION_CALL_RE.is_match(trimmed) && trimmed.matches('\'').count() % 2 == 0 {
            Self::FunctionCall
        } else {
            Self::Quoted
        }
    }
}

/// Render a default value for a `DEFAULT` clause.
pub fn render_default(raw: &str) -> String {
    let trimmed = raw.trim();
    match DefaultLiteral::classify(raw) {
        DefaultLiteral::Number | DefaultLiteral::FunctionCall => trimmed.to_string(),
        DefaultLiteral::Keyword => trimmed.to_ascii_lowercase(),
        DefaultLiteral::Quoted => quote_literal(raw),
    }
}

// =============================================================================
// Statement Builders
// =============================================================================

/// `"name" type [DEFAULT x] [NOT NULL]`
pub fn column_definition(column: &ColumnDescriptor) -> DbResult<String> {
    validate_name(&column.name)?;
    let data_type = validate_type(&column.data_type)?;

    let mut def = format!("{} {}", quote_ident(&column.name), data_type);
    if let Some(default) = column.default_value.as_deref().filter(|d| !d.trim().is_empty()) {
        def.push_str(" DEFAULT ");
        def.push_str(&render_default(default));
    }
    if column.is_nullable == Some(false) {
        def.push_str(" NOT NULL");
    }
    Ok(def)
}

pub fn build_create_table(table: &TableDescriptor) -> DbResult<String> {
    validate_name(&table.name)?;
    if table.columns.is_empty() {
        return Err(DbError::invalid_input(format!(
            "Table '{}' must declare at least one column",
            table.name
        )));
    }

    let mut clauses = table
        .columns
        .iter()
        .map(column_definition)
        .collect::<DbResult<Vec<_>>>()?;

    let primary = table.primary_key_columns();
    if primary.len() > 1 {
        return Err(DbError::invalid_input(format!(
            "Only one primary key column may be declared, got {}",
            primary.join(", ")
        )));
    }
    if let Some(pk) = primary.first() {
        clauses.push(format!("PRIMARY KEY ({})", quote_ident(pk)));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quote_ident(&table.name),
        clauses.join(",\n  ")
    ))
}

pub fn build_table_comment(table: &str, description: &str) -> DbResult<String> {
    validate_name(table)?;
    Ok(format!(
        "COMMENT ON TABLE {} IS {}",
        quote_ident(table),
        quote_literal(description)
    ))
}

pub fn build_add_column(table: &str, column: &ColumnDescriptor) -> DbResult<String> {
    validate_name(table)?;
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        column_definition(column)?
    ))
}

pub fn build_add_primary_key(table: &str, column: &str) -> DbResult<String> {
    validate_name(table)?;
    validate_name(column)?;
    Ok(format!(
        "ALTER TABLE {} ADD PRIMARY KEY ({})",
        quote_ident(table),
        quote_ident(column)
    ))
}

pub fn build_drop_column(table: &str, column: &str) -> DbResult<String> {
    validate_name(table)?;
    validate_name(column)?;
    Ok(format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_ident(table),
        quote_ident(column)
    ))
}

pub fn build_rename_column(table: &str, old_name: &str, new_name: &str) -> DbResult<String> {
    validate_name(table)?;
    validate_name(old_name)?;
    validate_name(new_name)?;
    Ok(format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote_ident(table),
        quote_ident(old_name),
        quote_ident(new_name)
    ))
}

/// The `USING` cast lets PostgreSQL convert existing data it would not coerce implicitly.
pub fn build_alter_column_type(table: &str, column: &str, new_type: &str) -> DbResult<String> {
    validate_name(table)?;
    validate_name(column)?;
    let data_type = validate_type(new_type)?;
    let quoted = quote_ident(column);
    Ok(format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
        quote_ident(table),
        quoted,
        data_type,
        quoted,
        data_type
    ))
}

fn build_lock_table(table: &str) -> String {
    format!("LOCK TABLE {} IN ACCESS EXCLUSIVE MODE", quote_ident(table))
}

/// Re-tag driver failures from a DDL statement.
fn ddl_error(err: DbError, table: &str) -> DbError {
    if err.sql_state() == Some(UNDEFINED_TABLE) {
        DbError::schema_not_found(DEFAULT_SCHEMA, table)
    } else {
        err.into_ddl_failure()
    }
}

// =============================================================================
// DDL Engine
// =============================================================================

/// Executes schema mutations against a tenant pool.
#[derive(Debug, Clone, Copy)]
pub struct DdlEngine {
    executor: StatementExecutor,
}

impl DdlEngine {
    pub fn new(executor: StatementExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> StatementExecutor {
        self.executor
    }

    /// Create a table if it does not exist, attaching the description as its comment.
    pub async fn create_table(&self, pool: &PgPool, table: &TableDescriptor) -> DbResult<()> {
        let create_sql = build_create_table(table)?;
        let comment_sql = table
            .description
            .as_deref()
            .map(|d| build_table_comment(&table.name, d))
            .transpose()?;

        match comment_sql {
            None => {
                self.executor
                    .execute(pool, &create_sql)
                    .await
                    .map_err(|e| ddl_error(e, &table.name))?;
            }
            Some(comment_sql) => {
                let mut tx = self.executor.begin(pool).await?;
                let result = async {
                    self.executor.execute(&mut *tx, &create_sql).await?;
                    self.executor.execute(&mut *tx, &comment_sql).await?;
                    Ok::<_, DbError>(())
                }
                .await;
                self.finish(tx, result, &table.name, "create table").await?;
            }
        }

        info!(table = %table.name, columns = table.columns.len(), "Table created");
        Ok(())
    }

    /// Add a column, and optionally make it the primary key, atomically.
    pub async fn add_column(
        &self,
        pool: &PgPool,
        table: &str,
        column: &ColumnDescriptor,
    ) -> DbResult<()> {
        let add_sql = build_add_column(table, column)?;
        let pk_sql = column
            .is_primary
            .then(|| build_add_primary_key(table, &column.name))
            .transpose()?;

        let mut tx = self.executor.begin(pool).await?;
        let result = self
            .add_column_in(&mut tx, table, column, &add_sql, pk_sql.as_deref())
            .await;
        self.finish(tx, result, table, "add column").await?;

        info!(table = %table, column = %column.name, primary = column.is_primary, "Column added");
        Ok(())
    }

    async fn add_column_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table: &str,
        column: &ColumnDescriptor,
        add_sql: &str,
        pk_sql: Option<&str>,
    ) -> DbResult<()> {
        self.executor
            .execute(&mut **tx, &build_lock_table(table))
            .await?;

        let exists = self
            .executor
            .fetch_exists(
                &mut **tx,
                queries::COLUMN_EXISTS,
                &[DEFAULT_SCHEMA, table, column.name.as_str()],
            )
            .await?;
        if exists {
            return Err(DbError::duplicate_column(table, &column.name));
        }

        self.executor.execute(&mut **tx, add_sql).await?;

        if let Some(pk_sql) = pk_sql {
            let has_pk = self
                .executor
                .fetch_exists(&mut **tx, queries::PRIMARY_KEY_EXISTS, &[DEFAULT_SCHEMA, table])
                .await?;
            if has_pk {
                return Err(DbError::duplicate_primary_key(table));
            }
            self.executor.execute(&mut **tx, pk_sql).await?;
        }

        Ok(())
    }

    pub async fn drop_column(&self, pool: &PgPool, table: &str, column: &str) -> DbResult<()> {
        let sql = build_drop_column(table, column)?;
        self.executor
            .execute(pool, &sql)
            .await
            .map_err(|e| ddl_error(e, table))?;
        info!(table = %table, column = %column, "Column dropped");
        Ok(())
    }

    pub async fn rename_column(
        &self,
        pool: &PgPool,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> DbResult<()> {
        let sql = build_rename_column(table, old_name, new_name)?;
        self.executor
            .execute(pool, &sql)
            .await
            .map_err(|e| ddl_error(e, table))?;
        info!(table = %table, from = %old_name, to = %new_name, "Column renamed");
        Ok(())
    }

    pub async fn alter_column_type(
        &self,
        pool: &PgPool,
        table: &str,
        column: &str,
        new_type: &str,
    ) -> DbResult<()> {
        let sql = build_alter_column_type(table, column, new_type)?;
        self.executor
            .execute(pool, &sql)
            .await
            .map_err(|e| ddl_error(e, table))?;
        info!(table = %table, column = %column, new_type = %new_type, "Column type altered");
        Ok(())
    }

    /// Commit on success; roll back and surface the error otherwise.
    async fn finish(
        &self,
        tx: Transaction<'_, Postgres>,
        result: DbResult<()>,
        table: &str,
        operation: &str,
    ) -> DbResult<()> {
        match result {
            Ok(()) => {
                tx.commit().await.map_err(|e| ddl_error(e.into(), table))?;
                debug!(table = %table, operation = %operation, "Transaction committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(table = %table, error = %rollback_err, "Rollback failed");
                }
                warn!(table = %table, operation = %operation, kind = ?err.kind(), "Rolled back DDL");
                Err(ddl_error(err, table))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_numbers() {
        for raw in ["0", "42", "-5", "+3.5", "10.", ".5", "1e10", "2.5E-3"] {
            assert_eq!(DefaultLiteral::classify(raw), DefaultLiteral::Number, "{raw}");
        }
        assert_eq!(DefaultLiteral::classify("1.2.3"), DefaultLiteral::Quoted);
        assert_eq!(DefaultLiteral::classify("12abc"), DefaultLiteral::Quoted);
    }

    #[test]
    fn test_classify_default_keywords() {
        assert_eq!(DefaultLiteral::classify("true"), DefaultLiteral::Keyword);
        assert_eq!(DefaultLiteral::classify("FALSE"), DefaultLiteral::Keyword);
        assert_eq!(DefaultLiteral::classify("Null"), DefaultLiteral::Keyword);
        assert_eq!(DefaultLiteral::classify("truthy"), DefaultLiteral::Quoted);
    }

    #[test]
    fn test_classify_default_function_calls() {
        for raw in [
            "now()",
            "uuid_generate_v4()",
            "gen_random_uuid()",
            "nextval('orders_id_seq')",
            "pg_catalog.now()",
            "round(1.5, 0)",
        ] {
            assert_eq!(DefaultLiteral::classify(raw), DefaultLiteral::FunctionCall, "{raw}");
        }
    }

    #[test]
    fn test_classify_default_rejects_call_like_injection() {
        for raw in [
            "now(); DROP TABLE orders",
            "f((select 1))",
            "f('unbalanced)",
            "now() -- comment",
            "1; DROP TABLE x",
        ] {
            assert_eq!(DefaultLiteral::classify(raw), DefaultLiteral::Quoted, "{raw}");
        }
    }

    #[test]
    fn test_render_default() {
        assert_eq!(render_default("42"), "42");
        assert_eq!(render_default("TRUE"), "true");
        assert_eq!(render_default("now()"), "now()");
        assert_eq!(render_default("pending"), "'pending'");
        assert_eq!(render_default("it's"), "'it''s'");
    }

    #[test]
    fn test_column_definition() {
        let col = ColumnDescriptor::new("status", "TEXT")
            .with_default("pending")
            .with_nullable(false);
        assert_eq!(
            column_definition(&col).unwrap(),
            "\"status\" text DEFAULT 'pending' NOT NULL"
        );

        let col = ColumnDescriptor::new("qty", "int").with_default("");
        assert_eq!(column_definition(&col).unwrap(), "\"qty\" int");

        let col = ColumnDescriptor::new("note", "text").with_nullable(true);
        assert_eq!(column_definition(&col).unwrap(), "\"note\" text");
    }

    #[test]
    fn test_column_definition_validates() {
        let err = column_definition(&ColumnDescriptor::new("bad name", "text")).unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));

        let err = column_definition(&ColumnDescriptor::new("x", "text; DROP TABLE y")).unwrap_err();
        assert!(matches!(err, DbError::InvalidType { .. }));

        let err = column_definition(&ColumnDescriptor::new("x", "varchar(20)")).unwrap_err();
        assert!(matches!(err, DbError::InvalidType { .. }));
    }

    #[test]
    fn test_build_create_table() {
        let table = TableDescriptor::new(
            "orders",
            vec![
                ColumnDescriptor::new("id", "serial").with_primary_key(true),
                ColumnDescriptor::new("amount", "numeric"),
            ],
        );
        assert_eq!(
            build_create_table(&table).unwrap(),
            "CREATE TABLE IF NOT EXISTS \"orders\" (\n  \"id\" serial,\n  \"amount\" numeric,\n  PRIMARY KEY (\"id\")\n)"
        );
    }

    #[test]
    fn test_build_create_table_rejects_bad_input() {
        let err = build_create_table(&TableDescriptor::new("orders", vec![])).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));

        let table = TableDescriptor::new(
            "orders",
            vec![
                ColumnDescriptor::new("a", "int").with_primary_key(true),
                ColumnDescriptor::new("b", "int").with_primary_key(true),
            ],
        );
        let err = build_create_table(&table).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));

        let table = TableDescriptor::new("1orders", vec![ColumnDescriptor::new("a", "int")]);
        let err = build_create_table(&table).unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_build_table_comment_escapes_quotes() {
        assert_eq!(
            build_table_comment("orders", "Bob's orders").unwrap(),
            "COMMENT ON TABLE \"orders\" IS 'Bob''s orders'"
        );
    }

    #[test]
    fn test_build_alter_statements() {
        assert_eq!(
            build_add_column("orders", &ColumnDescriptor::new("note", "text")).unwrap(),
            "ALTER TABLE \"orders\" ADD COLUMN \"note\" text"
        );
        assert_eq!(
            build_add_primary_key("orders", "id").unwrap(),
            "ALTER TABLE \"orders\" ADD PRIMARY KEY (\"id\")"
        );
        assert_eq!(
            build_drop_column("orders", "note").unwrap(),
            "ALTER TABLE \"orders\" DROP COLUMN \"note\""
        );
        assert_eq!(
            build_rename_column("orders", "note", "memo").unwrap(),
            "ALTER TABLE \"orders\" RENAME COLUMN \"note\" TO \"memo\""
        );
        assert_eq!(
            build_alter_column_type("orders", "qty", "Double Precision").unwrap(),
            "ALTER TABLE \"orders\" ALTER COLUMN \"qty\" TYPE double precision USING \"qty\"::double precision"
        );
    }

    #[test]
    fn test_alter_statements_validate() {
        assert!(matches!(
            build_rename_column("orders", "a", "b-c").unwrap_err(),
            DbError::InvalidIdentifier { .. }
        ));
        assert!(matches!(
            build_alter_column_type("orders", "qty", "money").unwrap_err(),
            DbError::InvalidType { .. }
        ));
        assert!(matches!(
            build_drop_column("orders\"", "a").unwrap_err(),
            DbError::InvalidIdentifier { .. }
        ));
    }

    #[test]
    fn test_ddl_error_mapping() {
        let err = ddl_error(DbError::engine("relation does not exist", Some("42P01".into())), "t");
        assert!(matches!(err, DbError::SchemaNotFound { .. }));

        let err = ddl_error(DbError::engine("cannot cast", Some("42846".into())), "t");
        assert!(matches!(err, DbError::DdlFailure { .. }));

        let err = ddl_error(DbError::duplicate_column("t", "c"), "t");
        assert!(matches!(err, DbError::DuplicateColumn { .. }));
    }
}
