//! Identifier and column-type validation.
//!
//! Every table, column, schema and tenant name passes through [`validate_name`]
//! before it is placed into a statement, and every declared column type passes
//! through [`validate_type`]. Only values that survived these checks are ever
//! concatenated into SQL; record values always travel as bound parameters.

use crate::error::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Column types accepted by DDL operations.
///
/// Anything else is rejected even if PostgreSQL would accept it, so the type
/// field can never smuggle an arbitrary expression into a statement.
pub const ALLOWED_TYPES: &[&str] = &[
    "text",
    "int",
    "integer",
    "smallint",
    "bigint",
    "numeric",
    "real",
    "double precision",
    "boolean",
    "uuid",
    "serial",
];

/// Validate a table, column, schema or tenant name.
pub fn validate_name(name: &str) -> DbResult<()> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(DbError::invalid_identifier(name))
    }
}

/// Validate every name in `names`, failing on the first bad one.
pub fn validate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> DbResult<()> {
    names.into_iter().try_for_each(validate_name)
}

/// Validate a column type against [`ALLOWED_TYPES`] (case-insensitive).
///
/// Returns the canonical lowercase spelling from the allow-list; statement
/// builders use that instead of the caller's string.
pub fn validate_type(type_name: &str) -> DbResult<&'static str> {
    let lower = type_name.to_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|allowed| **allowed == lower)
        .copied()
        .ok_or_else(|| {
            DbError::invalid_type(format!(
                "'{}' is not an allowed column type (allowed: {})",
                type_name,
                ALLOWED_TYPES.join(", ")
            ))
        })
}

/// Double-quote an already validated identifier.
pub fn quote_ident(name: &str) -> String {
    debug_assert!(IDENTIFIER_RE.is_match(name), "unvalidated identifier");
    format!("\"{}\"", name)
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
