//! Generic record CRUD against a named table.
//!
//! Every operation loads the table's live columns first. Record keys, filter
//! keys and id columns must name live columns (`InvalidColumn` otherwise).
//! Inserted and updated values are checked against their column's type before
//! anything is sent; filter and id values are left to the placeholder cast.
//! Values only ever travel as bound parameters.

use crate::db::executor::StatementExecutor;
use crate::db::params::placeholder;
use crate::db::schema::{DEFAULT_SCHEMA, SchemaIntrospector};
use crate::db::types::{RowToJson, check_value};
use crate::error::{DbError, DbResult};
use crate::models::{LiveColumnInfo, Record, RecordFilter, RecordValue, Row, TableData};
use crate::validate::{quote_ident, validate_name};
use sqlx::PgPool;
use tracing::debug;

/// Statement text with its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub params: Vec<RecordValue>,
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn cast_placeholder(columns: &[LiveColumnInfo], name: &str, index: usize) -> String {
    columns
        .iter()
        .find(|c| c.name == name)
        .map(|c| placeholder(index, c))
        .unwrap_or_else(|| format!("${}", index))
}

/// Fail with `InvalidColumn` listing every name not among `columns`.
pub fn ensure_columns_exist<'a>(
    table: &str,
    columns: &[LiveColumnInfo],
    names: impl IntoIterator<Item = &'a str>,
) -> DbResult<()> {
    let mut unknown: Vec<String> = names
        .into_iter()
        .filter(|name| !columns.iter().any(|c| c.name == *name))
        .map(str::to_string)
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort();
    unknown.dedup();
    Err(DbError::invalid_column(table, unknown))
}

/// Type-check each value against its column.
fn check_values<'a>(
    columns: &[LiveColumnInfo],
    values: impl IntoIterator<Item = (&'a String, &'a RecordValue)>,
) -> DbResult<()> {
    for (name, value) in values {
        if let Some(column) = columns.iter().find(|c| &c.name == name) {
            check_value(column, value)?;
        }
    }
    Ok(())
}

/// An id match needs a value; `= NULL` never matches a row.
///
/// The value itself is not type-checked: the placeholder cast lets PostgreSQL
/// convert text ids such as `"1"` for integer columns.
fn ensure_id_value(id_column: &str, id_value: &RecordValue) -> DbResult<()> {
    if id_value.is_null() {
        return Err(DbError::invalid_input(format!(
            "Id value for column '{}' must not be null",
            id_column
        )));
    }
    Ok(())
}

// =============================================================================
// Statement Builders
// =============================================================================

pub fn build_insert(table: &str, columns: &[LiveColumnInfo], record: &Record) -> BuiltStatement {
    let target = qualified(DEFAULT_SCHEMA, table);
    if record.is_empty() {
        return BuiltStatement {
            sql: format!("INSERT INTO {} DEFAULT VALUES RETURNING *", target),
            params: Vec::new(),
        };
    }

    let names: Vec<String> = record.keys().map(|k| quote_ident(k)).collect();
    let placeholders: Vec<String> = record
        .keys()
        .enumerate()
        .map(|(i, k)| cast_placeholder(columns, k, i + 1))
        .collect();

    BuiltStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            target,
            names.join(", "),
            placeholders.join(", ")
        ),
        params: record.values().cloned().collect(),
    }
}

/// `SELECT *` with one conjunctive equality per filter entry; null matches with `IS NULL`.
pub fn build_select(
    schema: &str,
    table: &str,
    columns: &[LiveColumnInfo],
    filter: &RecordFilter,
) -> BuiltStatement {
    let mut sql = format!("SELECT * FROM {}", qualified(schema, table));
    let mut params = Vec::new();
    let mut conditions = Vec::with_capacity(filter.len());

    for (name, value) in filter {
        if value.is_null() {
            conditions.push(format!("{} IS NULL", quote_ident(name)));
        } else {
            params.push(value.clone());
            conditions.push(format!(
                "{} = {}",
                quote_ident(name),
                cast_placeholder(columns, name, params.len())
            ));
        }
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    BuiltStatement { sql, params }
}

pub fn build_update(
    table: &str,
    columns: &[LiveColumnInfo],
    id_column: &str,
    id_value: &RecordValue,
    updates: &Record,
) -> BuiltStatement {
    let assignments: Vec<String> = updates
        .keys()
        .enumerate()
        .map(|(i, k)| format!("{} = {}", quote_ident(k), cast_placeholder(columns, k, i + 1)))
        .collect();
    let mut params: Vec<RecordValue> = updates.values().cloned().collect();
    params.push(id_value.clone());

    BuiltStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING *",
            qualified(DEFAULT_SCHEMA, table),
            assignments.join(", "),
            quote_ident(id_column),
            cast_placeholder(columns, id_column, params.len())
        ),
        params,
    }
}

pub fn build_delete(
    table: &str,
    columns: &[LiveColumnInfo],
    id_column: &str,
    id_value: &RecordValue,
) -> BuiltStatement {
    BuiltStatement {
        sql: format!(
            "DELETE FROM {} WHERE {} = {} RETURNING *",
            qualified(DEFAULT_SCHEMA, table),
            quote_ident(id_column),
            cast_placeholder(columns, id_column, 1)
        ),
        params: vec![id_value.clone()],
    }
}

// =============================================================================
// Record Access Engine
// =============================================================================

/// Runs record operations against a tenant pool.
#[derive(Debug, Clone, Copy)]
pub struct RecordAccessEngine {
    executor: StatementExecutor,
    introspector: SchemaIntrospector,
}

impl RecordAccessEngine {
    pub fn new(executor: StatementExecutor) -> Self {
        Self {
            executor,
            introspector: SchemaIntrospector::new(executor),
        }
    }

    /// Insert one record and return the stored row.
    pub async fn insert(&self, pool: &PgPool, table: &str, record: &Record) -> DbResult<Row> {
        validate_name(table)?;
        let columns = self.introspector.get_columns(pool, DEFAULT_SCHEMA, table).await?;
        ensure_columns_exist(table, &columns, record.keys().map(String::as_str))?;
        check_values(&columns, record)?;

        let stmt = build_insert(table, &columns, record);
        debug!(table = %table, columns = record.len(), "Inserting record");
        let row = self
            .executor
            .fetch_optional(pool, &stmt.sql, &stmt.params)
            .await?
            .ok_or_else(|| DbError::engine("INSERT ... RETURNING produced no row", None))?;
        Ok(row.to_json_map())
    }

    /// Rows matching every filter entry; an empty filter returns the whole table.
    pub async fn read(
        &self,
        pool: &PgPool,
        table: &str,
        filter: &RecordFilter,
    ) -> DbResult<Vec<Row>> {
        validate_name(table)?;
        let columns = self.introspector.get_columns(pool, DEFAULT_SCHEMA, table).await?;
        ensure_columns_exist(table, &columns, filter.keys().map(String::as_str))?;

        let stmt = build_select(DEFAULT_SCHEMA, table, &columns, filter);
        debug!(table = %table, conditions = filter.len(), "Reading records");
        let rows = self.executor.fetch_all(pool, &stmt.sql, &stmt.params).await?;
        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    /// Update the row(s) whose `id_column` equals `id_value`.
    ///
    /// Returns the first updated row, or `None` when nothing matched.
    pub async fn update(
        &self,
        pool: &PgPool,
        table: &str,
        id_column: &str,
        id_value: &RecordValue,
        updates: &Record,
    ) -> DbResult<Option<Row>> {
        validate_name(table)?;
        validate_name(id_column)?;
        if updates.is_empty() {
            return Err(DbError::invalid_input("No columns to update"));
        }
        let columns = self.introspector.get_columns(pool, DEFAULT_SCHEMA, table).await?;
        ensure_columns_exist(
            table,
            &columns,
            updates
                .keys()
                .map(String::as_str)
                .chain(std::iter::once(id_column)),
        )?;
        check_values(&columns, updates)?;
        ensure_id_value(id_column, id_value)?;

        let stmt = build_update(table, &columns, id_column, id_value, updates);
        debug!(table = %table, id_column = %id_column, columns = updates.len(), "Updating record");
        let row = self
            .executor
            .fetch_optional(pool, &stmt.sql, &stmt.params)
            .await?;
        Ok(row.map(|r| r.to_json_map()))
    }

    /// Delete the row(s) whose `id_column` equals `id_value`.
    ///
    /// Returns the first deleted row, or `None` when nothing matched.
    pub async fn delete(
        &self,
        pool: &PgPool,
        table: &str,
        id_column: &str,
        id_value: &RecordValue,
    ) -> DbResult<Option<Row>> {
        validate_name(table)?;
        validate_name(id_column)?;
        let columns = self.introspector.get_columns(pool, DEFAULT_SCHEMA, table).await?;
        ensure_columns_exist(table, &columns, [id_column])?;
        ensure_id_value(id_column, id_value)?;

        let stmt = build_delete(table, &columns, id_column, id_value);
        debug!(table = %table, id_column = %id_column, "Deleting record");
        let row = self
            .executor
            .fetch_optional(pool, &stmt.sql, &stmt.params)
            .await?;
        Ok(row.map(|r| r.to_json_map()))
    }

    /// Column metadata of `schema.table`.
    pub async fn get_columns_list(
        &self,
        pool: &PgPool,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<LiveColumnInfo>> {
        self.introspector.get_columns(pool, schema, table).await
    }

    /// Column metadata together with every row of `schema.table`.
    pub async fn get_table_with_columns_and_data(
        &self,
        pool: &PgPool,
        schema: &str,
        table: &str,
    ) -> DbResult<TableData> {
        let columns = self.introspector.get_columns(pool, schema, table).await?;
        let stmt = build_select(schema, table, &columns, &RecordFilter::new());
        let rows = self.executor.fetch_all(pool, &stmt.sql, &[]).await?;
        debug!(schema = %schema, table = %table, rows = rows.len(), "Loaded table data");
        Ok(TableData {
            columns,
            rows: rows.iter().map(RowToJson::to_json_map).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_columns() -> Vec<LiveColumnInfo> {
        vec![
            LiveColumnInfo::new("id", "integer", "int4")
                .with_nullable(false)
                .with_primary_key(true),
            LiveColumnInfo::new("amount", "numeric", "numeric"),
            LiveColumnInfo::new("status", "text", "text").with_nullable(false),
        ]
    }

    fn record(pairs: &[(&str, RecordValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_insert() {
        let rec = record(&[
            ("amount", RecordValue::Float(10.5)),
            ("status", RecordValue::from("new")),
        ]);
        let stmt = build_insert("orders", &order_columns(), &rec);
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"public\".\"orders\" (\"amount\", \"status\") VALUES ($1::\"numeric\", $2::\"text\") RETURNING *"
        );
        assert_eq!(
            stmt.params,
            vec![RecordValue::Float(10.5), RecordValue::from("new")]
        );
    }

    #[test]
    fn test_build_insert_empty_record_uses_defaults() {
        let stmt = build_insert("orders", &order_columns(), &Record::new());
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"public\".\"orders\" DEFAULT VALUES RETURNING *"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_build_select_without_filter() {
        let stmt = build_select("public", "orders", &order_columns(), &RecordFilter::new());
        assert_eq!(stmt.sql, "SELECT * FROM \"public\".\"orders\"");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_build_select_with_filter() {
        let filter = record(&[
            ("id", RecordValue::Int(7)),
            ("status", RecordValue::from("paid")),
        ]);
        let stmt = build_select("public", "orders", &order_columns(), &filter);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"public\".\"orders\" WHERE \"id\" = $1::\"int4\" AND \"status\" = $2::\"text\""
        );
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_build_select_null_filter_uses_is_null() {
        let filter = record(&[
            ("amount", RecordValue::Null),
            ("status", RecordValue::from("paid")),
        ]);
        let stmt = build_select("public", "orders", &order_columns(), &filter);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"public\".\"orders\" WHERE \"amount\" IS NULL AND \"status\" = $1::\"text\""
        );
        assert_eq!(stmt.params, vec![RecordValue::from("paid")]);
    }

    #[test]
    fn test_build_update() {
        let updates = record(&[
            ("amount", RecordValue::Int(12)),
            ("status", RecordValue::from("paid")),
        ]);
        let stmt = build_update("orders", &order_columns(), "id", &RecordValue::Int(1), &updates);
        assert_eq!(
            stmt.sql,
            "UPDATE \"public\".\"orders\" SET \"amount\" = $1::\"numeric\", \"status\" = $2::\"text\" WHERE \"id\" = $3::\"int4\" RETURNING *"
        );
        assert_eq!(stmt.params.last(), Some(&RecordValue::Int(1)));
    }

    #[test]
    fn test_build_delete() {
        let stmt = build_delete("orders", &order_columns(), "id", &RecordValue::Int(99));
        assert_eq!(
            stmt.sql,
            "DELETE FROM \"public\".\"orders\" WHERE \"id\" = $1::\"int4\" RETURNING *"
        );
        assert_eq!(stmt.params, vec![RecordValue::Int(99)]);
    }

    #[test]
    fn test_ensure_columns_exist_lists_unknown_sorted() {
        let columns = order_columns();
        assert!(ensure_columns_exist("orders", &columns, ["id", "amount"]).is_ok());

        let err = ensure_columns_exist("orders", &columns, ["zeta", "id", "alpha", "zeta"])
            .unwrap_err();
        match err {
            DbError::InvalidColumn { table, columns } => {
                assert_eq!(table, "orders");
                assert_eq!(columns, vec!["alpha".to_string(), "zeta".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_check_values_rejects_wrong_shape_and_null() {
        let columns = order_columns();
        let ok = record(&[("amount", RecordValue::Float(10.5))]);
        assert!(check_values(&columns, &ok).is_ok());

        let bad = record(&[("amount", RecordValue::from("abc"))]);
        assert!(matches!(
            check_values(&columns, &bad).unwrap_err(),
            DbError::InvalidType { .. }
        ));

        let null_status = record(&[("status", RecordValue::Null)]);
        assert!(matches!(
            check_values(&columns, &null_status).unwrap_err(),
            DbError::InvalidType { .. }
        ));
    }

    #[test]
    fn test_id_value_must_not_be_null() {
        assert!(ensure_id_value("id", &RecordValue::Int(1)).is_ok());
        assert!(ensure_id_value("id", &RecordValue::from("1")).is_ok());
        assert!(matches!(
            ensure_id_value("id", &RecordValue::Null).unwrap_err(),
            DbError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_text_id_is_cast_by_placeholder() {
        let filter = record(&[("id", RecordValue::from("1"))]);
        let stmt = build_select("public", "orders", &order_columns(), &filter);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"public\".\"orders\" WHERE \"id\" = $1::\"int4\""
        );
        assert_eq!(stmt.params, vec![RecordValue::from("1")]);

        let stmt = build_delete("orders", &order_columns(), "id", &RecordValue::from("1"));
        assert_eq!(
            stmt.sql,
            "DELETE FROM \"public\".\"orders\" WHERE \"id\" = $1::\"int4\" RETURNING *"
        );
    }

    #[tokio::test]
    async fn test_update_requires_changes() {
        let engine = RecordAccessEngine::new(StatementExecutor::new(
            std::time::Duration::from_secs(1),
        ));
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let err = engine
            .update(&pool, "orders", "id", &RecordValue::Int(1), &Record::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_operations_validate_identifiers_first() {
        let engine = RecordAccessEngine::new(StatementExecutor::new(
            std::time::Duration::from_secs(1),
        ));
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();

        let err = engine
            .read(&pool, "orders\"; --", &RecordFilter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));

        let err = engine
            .delete(&pool, "orders", "id = 1 OR 1", &RecordValue::Int(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));
    }
}
