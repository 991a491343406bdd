//! Schema-related data models.
//!
//! Caller-supplied descriptors for DDL operations and the catalog-derived
//! views returned by introspection.

use serde::{Deserialize, Deserializer, Serialize};

/// Column definition supplied by a caller to `create_table` / `add_column`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Must be one of [`crate::validate::ALLOWED_TYPES`]
    #[serde(rename = "type")]
    pub data_type: String,
    /// Raw default literal; classified and quoted when the statement is built
    #[serde(
        default,
        alias = "defaultValue",
        deserialize_with = "deserialize_default_literal",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<String>,
    /// `Some(false)` emits NOT NULL; anything else leaves the column nullable
    #[serde(default, alias = "isNullable", skip_serializing_if = "Option::is_none")]
    pub is_nullable: Option<bool>,
    #[serde(default, alias = "isPrimary")]
    pub is_primary: bool,
}

impl ColumnDescriptor {
    /// Create a new nullable, non-primary column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            default_value: None,
            is_nullable: None,
            is_primary: false,
        }
    }

    /// Set the default value literal.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Set explicit nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = Some(nullable);
        self
    }

    /// Mark this column as (part of) the primary key.
    pub fn with_primary_key(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }
}

/// Accept string, number or boolean JSON for a default literal.
fn deserialize_default_literal<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "default value must be a string, number or boolean, got {}",
            other
        ))),
    }
}

/// Table definition supplied by a caller to `create_table`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    /// Stored as the table comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            description: None,
            columns,
        }
    }

    /// Set the table description (comment).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Names of the columns flagged as primary key, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Column metadata read from the live catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveColumnInfo {
    pub name: String,
    /// `information_schema.columns.data_type` (e.g. `integer`, `character varying`)
    pub data_type: String,
    /// Underlying type name (e.g. `int4`, `varchar`, `timestamptz`)
    pub udt_name: String,
    pub is_nullable: bool,
    pub is_primary: bool,
}

impl LiveColumnInfo {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        udt_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            udt_name: udt_name.into(),
            is_nullable: true,
            is_primary: false,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn with_primary_key(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }
}

/// Per-table usage summary returned by `get_all_tables_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableUsage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Planner estimate after a fresh ANALYZE
    pub rows_estimated: i64,
    /// Human-readable total relation size (e.g. `16 kB`)
    pub size: String,
    pub columns_count: i64,
}

/// Column metadata together with every row of a table.
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub columns: Vec<LiveColumnInfo>,
    pub rows: Vec<crate::models::Row>,
}
