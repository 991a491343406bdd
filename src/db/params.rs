//! Parameter binding utilities.
//!
//! Record values never appear in statement text. Each one is bound to a
//! numbered placeholder, and the placeholder carries a cast to the target
//! column's catalog type so PostgreSQL converts the bound value explicitly.

use crate::models::{LiveColumnInfo, RecordValue};
use crate::validate::validate_name;
use sqlx::Postgres;
use sqlx::postgres::PgArguments;

pub(crate) type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Bind a record value to a PostgreSQL query.
pub(crate) fn bind_param<'q>(query: PgQuery<'q>, param: &'q RecordValue) -> PgQuery<'q> {
    match param {
        RecordValue::Null => query.bind(None::<String>),
        RecordValue::Bool(v) => query.bind(*v),
        RecordValue::Int(v) => query.bind(*v),
        RecordValue::Float(v) => query.bind(*v),
        RecordValue::String(v) => query.bind(v.as_str()),
    }
}

/// Placeholder `$index` cast to the column's type, e.g. `$1::"int4"`.
///
/// Falls back to a bare placeholder when the type name is not a plain
/// identifier (it is spliced into the statement, so it must be one).
pub(crate) fn placeholder(index: usize, column: &LiveColumnInfo) -> String {
    if validate_name(&column.udt_name).is_ok() {
        format!("${}::\"{}\"", index, column.udt_name)
    } else {
        format!("${}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_casts_to_udt() {
        let col = LiveColumnInfo::new("id", "uuid", "uuid");
        assert_eq!(placeholder(1, &col), "$1::\"uuid\"");

        let col = LiveColumnInfo::new("amount", "numeric", "numeric");
        assert_eq!(placeholder(3, &col), "$3::\"numeric\"");
    }

    #[test]
    fn test_placeholder_array_udt() {
        // Array udt names start with an underscore and are still plain identifiers
        let col = LiveColumnInfo::new("tags", "ARRAY", "_text");
        assert_eq!(placeholder(2, &col), "$2::\"_text\"");
    }

    #[test]
    fn test_placeholder_without_cast_for_odd_udt() {
        let col = LiveColumnInfo::new("x", "USER-DEFINED", "my type");
        assert_eq!(placeholder(4, &col), "$4");
    }
}
