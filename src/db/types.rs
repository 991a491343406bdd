//! Catalog type classification, record type checking and row decoding.
//!
//! # Architecture
//!
//! Type handling uses a two-phase approach:
//! 1. `TypeCategory` classifies a catalog or driver type name into a logical category
//! 2. Category-specific code either checks an incoming [`RecordValue`] against it
//!    ([`check_value`]) or decodes an outgoing column into JSON ([`RowToJson`])
//!
//! Both directions share the one classification, so a column that accepts a value
//! on insert decodes it back in the same family on read.

use crate::error::{DbError, DbResult};
use crate::models::{LiveColumnInfo, RecordValue, Row};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo};
use std::fmt::Write as _;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Json,
    Binary,
    Unknown,
}

/// Classify a type name into a logical category.
///
/// Accepts the spellings found in `information_schema.columns.data_type`, in
/// `udt_name`, and in driver type info (which is upper case).
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.trim().to_lowercase();

    match lower.as_str() {
        "int2" | "int4" | "int8" | "int" | "smallint" | "integer" | "bigint" | "serial"
        | "smallserial" | "bigserial" | "serial2" | "serial4" | "serial8" => TypeCategory::Integer,
        "numeric" | "decimal" => TypeCategory::Decimal,
        "float4" | "float8" | "real" | "double precision" => TypeCategory::Float,
        "bool" | "boolean" => TypeCategory::Boolean,
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "name"
        | "citext" => TypeCategory::Text,
        "uuid" => TypeCategory::Uuid,
        "timestamp" | "timestamp without time zone" => TypeCategory::Timestamp,
        "timestamptz" | "timestamp with time zone" => TypeCategory::TimestampTz,
        "date" => TypeCategory::Date,
        "time" | "timetz" | "time without time zone" | "time with time zone" => TypeCategory::Time,
        "json" | "jsonb" => TypeCategory::Json,
        "bytea" => TypeCategory::Binary,
        _ => TypeCategory::Unknown,
    }
}

/// Category of a live column, preferring `udt_name` and falling back to `data_type`.
pub fn column_category(column: &LiveColumnInfo) -> TypeCategory {
    match categorize_type(&column.udt_name) {
        TypeCategory::Unknown => categorize_type(&column.data_type),
        category => category,
    }
}

// =============================================================================
// Type Compatibility
// =============================================================================

/// Check that `value` may be stored in `column`.
///
/// Null is accepted only for nullable columns. Non-null values must match the
/// runtime shape the column's type family accepts; unrecognised families are
/// accepted unchecked.
pub fn check_value(column: &LiveColumnInfo, value: &RecordValue) -> DbResult<()> {
    if value.is_null() {
        return if column.is_nullable {
            Ok(())
        } else {
            Err(DbError::invalid_type(format!(
                "Column '{}' does not accept null values",
                column.name
            )))
        };
    }

    let category = column_category(column);
    let accepted = match category {
        TypeCategory::Integer => value.is_whole_number(),
        TypeCategory::Float | TypeCategory::Decimal => {
            matches!(value, RecordValue::Int(_) | RecordValue::Float(_))
        }
        TypeCategory::Boolean => match value {
            RecordValue::Bool(_) => true,
            RecordValue::String(s) => s == "true" || s == "false",
            _ => false,
        },
        TypeCategory::Text | TypeCategory::Uuid => matches!(value, RecordValue::String(_)),
        TypeCategory::Timestamp
        | TypeCategory::TimestampTz
        | TypeCategory::Date
        | TypeCategory::Time => match value {
            RecordValue::String(s) => is_temporal_string(s),
            _ => false,
        },
        TypeCategory::Json | TypeCategory::Binary | TypeCategory::Unknown => true,
    };

    if accepted {
        Ok(())
    } else {
        Err(DbError::invalid_type(format!(
            "Column '{}' of type {} does not accept {} value",
            column.name,
            column.data_type,
            value.type_name()
        )))
    }
}

/// True if `s` parses as a timestamp, date or time of day.
pub fn is_temporal_string(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    DateTime::parse_from_rfc3339(s).is_ok()
        || DateTime::<FixedOffset>::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

// =============================================================================
// Decimal Type Support
// =============================================================================

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Largest count of significant digits rendered as a JSON number; longer values stay text.
const MAX_JSON_NUMBER_DIGITS: usize = 15;

/// NUMERIC value as its exact decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDecimal(pub String);

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("numeric")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        ty.name().eq_ignore_ascii_case("numeric")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => Ok(RawDecimal(decode_numeric_binary(value.as_bytes()?)?)),
        }
    }
}

/// Decode PostgreSQL's binary NUMERIC representation into decimal text.
///
/// Layout: `ndigits: i16, weight: i16, sign: u16, dscale: u16`, then `ndigits`
/// base-10000 digits as `i16`. `weight` is the power of 10000 of the first digit.
pub fn decode_numeric_binary(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    let header = |i: usize| [bytes[i], bytes[i + 1]];
    if bytes.len() < 8 {
        return Err(format!("numeric value too short: {} bytes", bytes.len()).into());
    }

    let ndigits = i16::from_be_bytes(header(0));
    let weight = i16::from_be_bytes(header(2));
    let sign = u16::from_be_bytes(header(4));
    let dscale = u16::from_be_bytes(header(6)) as usize;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign 0x{:04X}", other).into()),
    }

    let ndigits = usize::try_from(ndigits).map_err(|_| "negative numeric digit count")?;
    if bytes.len() < 8 + ndigits * 2 {
        return Err(format!("numeric value truncated: expected {} digits", ndigits).into());
    }
    let digits: Vec<i16> = bytes[8..8 + ndigits * 2]
        .chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let digit_at = |i: i32| -> i16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=i32::from(weight) {
            if i == 0 {
                write!(out, "{}", digit_at(i))?;
            } else {
                write!(out, "{:04}", digit_at(i))?;
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = i32::from(weight) + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit_at(i))?;
            i += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

/// Render exact decimal text as a JSON number when it fits without rounding.
pub fn decimal_to_json(text: &str) -> JsonValue {
    let significant = text
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|c| *c == '0')
        .count();
    if significant > MAX_JSON_NUMBER_DIGITS {
        return JsonValue::String(text.to_string());
    }
    text.parse::<serde_json::Number>()
        .map(JsonValue::Number)
        .unwrap_or_else(|_| JsonValue::String(text.to_string()))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> Row;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> Row {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name);
                let value = decode::decode_column(self, idx, type_name, category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

mod decode {
    use super::*;
    use sqlx::Row as _;
    use sqlx::postgres::types::PgTimeTz;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            TypeCategory::TimestampTz => decode_timestamptz(row, idx),
            TypeCategory::Timestamp => decode_timestamp(row, idx),
            TypeCategory::Date => decode_date(row, idx),
            TypeCategory::Time => decode_time(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx, type_name),
        }
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => decimal_to_json(&v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode NUMERIC: {:?}", e);
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
        }
        row.try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::Number(v.into()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        let value = match row.try_get::<Option<f32>, _>(idx) {
            Ok(v) => v.map(widen_f32),
            Err(_) => row.try_get::<Option<f64>, _>(idx).ok().flatten(),
        };
        match value {
            Some(v) => serde_json::Number::from_f64(v)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(v.to_string())),
            None => JsonValue::Null,
        }
    }

    fn decode_json(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_timestamptz(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<DateTime<Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_rfc3339()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_timestamp(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_date(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_time(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return v
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null);
        }
        // timetz
        row.try_get::<Option<PgTimeTz<NaiveTime, FixedOffset>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(format!("{}{}", v.time, v.offset)))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_binary(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|bytes| JsonValue::String(bytea_hex(&bytes)))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(v) => v.map(JsonValue::String).unwrap_or(JsonValue::Null),
            Err(e) => {
                tracing::debug!(column = idx, type_name = %type_name, error = %e, "Column not decodable as text");
                JsonValue::Null
            }
        }
    }
}

/// Widen a `real` through its shortest decimal text, so `1.1f32` reads back as `1.1`.
pub fn widen_f32(v: f32) -> f64 {
    v.to_string().parse::<f64>().unwrap_or(f64::from(v))
}

/// Format bytes the way PostgreSQL prints `bytea` in hex output mode.
pub fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_bytes(weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(digits.len() as i16).to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&sign.to_be_bytes());
        bytes.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            bytes.extend_from_slice(&d.to_be_bytes());
        }
        bytes
    }

    fn int_col(nullable: bool) -> LiveColumnInfo {
        LiveColumnInfo::new("qty", "integer", "int4").with_nullable(nullable)
    }

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("int4"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("serial"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT2"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_catalog_spellings() {
        assert_eq!(categorize_type("double precision"), TypeCategory::Float);
        assert_eq!(categorize_type("character varying"), TypeCategory::Text);
        assert_eq!(
            categorize_type("timestamp with time zone"),
            TypeCategory::TimestampTz
        );
        assert_eq!(
            categorize_type("time without time zone"),
            TypeCategory::Time
        );
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("jsonb"), TypeCategory::Json);
        assert_eq!(categorize_type("_int4"), TypeCategory::Unknown);
        assert_eq!(categorize_type("USER-DEFINED"), TypeCategory::Unknown);
    }

    #[test]
    fn test_column_category_falls_back_to_data_type() {
        let col = LiveColumnInfo::new("c", "integer", "my_domain");
        assert_eq!(column_category(&col), TypeCategory::Integer);
    }

    #[test]
    fn test_check_integer_column() {
        let col = int_col(true);
        assert!(check_value(&col, &RecordValue::Int(3)).is_ok());
        assert!(check_value(&col, &RecordValue::Float(3.0)).is_ok());
        assert!(check_value(&col, &RecordValue::Float(3.5)).is_err());
        assert!(check_value(&col, &RecordValue::from("3")).is_err());
        assert!(check_value(&col, &RecordValue::Bool(true)).is_err());
    }

    #[test]
    fn test_check_numeric_column() {
        let col = LiveColumnInfo::new("amount", "numeric", "numeric");
        assert!(check_value(&col, &RecordValue::Float(10.5)).is_ok());
        assert!(check_value(&col, &RecordValue::Int(10)).is_ok());
        let err = check_value(&col, &RecordValue::from("abc")).unwrap_err();
        assert!(matches!(err, DbError::InvalidType { .. }));
    }

    #[test]
    fn test_check_boolean_column() {
        let col = LiveColumnInfo::new("active", "boolean", "bool");
        assert!(check_value(&col, &RecordValue::Bool(false)).is_ok());
        assert!(check_value(&col, &RecordValue::from("true")).is_ok());
        assert!(check_value(&col, &RecordValue::from("false")).is_ok());
        assert!(check_value(&col, &RecordValue::from("yes")).is_err());
        assert!(check_value(&col, &RecordValue::Int(1)).is_err());
    }

    #[test]
    fn test_check_text_and_uuid_columns() {
        let text = LiveColumnInfo::new("name", "character varying", "varchar");
        assert!(check_value(&text, &RecordValue::from("x")).is_ok());
        assert!(check_value(&text, &RecordValue::Int(1)).is_err());

        let uuid = LiveColumnInfo::new("ref", "uuid", "uuid");
        assert!(check_value(&uuid, &RecordValue::from("not checked here")).is_ok());
        assert!(check_value(&uuid, &RecordValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_check_temporal_columns() {
        let col = LiveColumnInfo::new("created_at", "timestamp with time zone", "timestamptz");
        assert!(check_value(&col, &RecordValue::from("2024-05-01T10:00:00Z")).is_ok());
        assert!(check_value(&col, &RecordValue::from("2024-05-01 10:00:00+02")).is_ok());
        assert!(check_value(&col, &RecordValue::from("2024-05-01")).is_ok());
        assert!(check_value(&col, &RecordValue::from("yesterday-ish")).is_err());
        assert!(check_value(&col, &RecordValue::Int(1714557600)).is_err());
    }

    #[test]
    fn test_check_permissive_for_unknown_types() {
        let col = LiveColumnInfo::new("tags", "ARRAY", "_text");
        assert!(check_value(&col, &RecordValue::Int(1)).is_ok());
        assert!(check_value(&col, &RecordValue::from("{a,b}")).is_ok());
    }

    #[test]
    fn test_null_follows_nullability() {
        assert!(check_value(&int_col(true), &RecordValue::Null).is_ok());
        let err = check_value(&int_col(false), &RecordValue::Null).unwrap_err();
        assert!(matches!(err, DbError::InvalidType { .. }));
        assert!(err.to_string().contains("qty"));
    }

    #[test]
    fn test_temporal_string_parsing() {
        assert!(is_temporal_string("2024-01-31"));
        assert!(is_temporal_string("2024-01-31T12:30:00"));
        assert!(is_temporal_string("2024-01-31 12:30:00.123"));
        assert!(is_temporal_string("12:30"));
        assert!(is_temporal_string("12:30:15"));
        assert!(!is_temporal_string(""));
        assert!(!is_temporal_string("2024-13-01"));
        assert!(!is_temporal_string("noon"));
    }

    #[test]
    fn test_decode_numeric_binary() {
        // 10.5 = [10, 5000] weight 0, dscale 1
        let bytes = numeric_bytes(0, NUMERIC_POS, 1, &[10, 5000]);
        assert_eq!(decode_numeric_binary(&bytes).unwrap(), "10.5");

        // 12345.678 = [1, 2345, 6780] weight 1, dscale 3
        let bytes = numeric_bytes(1, NUMERIC_POS, 3, &[1, 2345, 6780]);
        assert_eq!(decode_numeric_binary(&bytes).unwrap(), "12345.678");

        // -0.0001 = [1] weight -1, dscale 4
        let bytes = numeric_bytes(-1, NUMERIC_NEG, 4, &[1]);
        assert_eq!(decode_numeric_binary(&bytes).unwrap(), "-0.0001");

        // 20000 = [2] weight 1, trailing zero group elided
        let bytes = numeric_bytes(1, NUMERIC_POS, 0, &[2]);
        assert_eq!(decode_numeric_binary(&bytes).unwrap(), "20000");

        // 0.00 = no digits, dscale 2
        let bytes = numeric_bytes(0, NUMERIC_POS, 2, &[]);
        assert_eq!(decode_numeric_binary(&bytes).unwrap(), "0.00");
    }

    #[test]
    fn test_decode_numeric_special_values() {
        assert_eq!(
            decode_numeric_binary(&numeric_bytes(0, NUMERIC_NAN, 0, &[])).unwrap(),
            "NaN"
        );
        assert_eq!(
            decode_numeric_binary(&numeric_bytes(0, NUMERIC_NINF, 0, &[])).unwrap(),
            "-Infinity"
        );
    }

    #[test]
    fn test_decode_numeric_rejects_malformed() {
        assert!(decode_numeric_binary(&[0, 1]).is_err());
        // Claims two digits but carries one
        let mut bytes = numeric_bytes(0, NUMERIC_POS, 0, &[1]);
        bytes[1] = 2;
        assert!(decode_numeric_binary(&bytes).is_err());
        assert!(decode_numeric_binary(&numeric_bytes(0, 0x1234, 0, &[])).is_err());
    }

    #[test]
    fn test_decimal_to_json() {
        assert_eq!(decimal_to_json("10.5"), serde_json::json!(10.5));
        assert_eq!(decimal_to_json("42"), serde_json::json!(42));
        assert_eq!(decimal_to_json("NaN"), serde_json::json!("NaN"));
        assert_eq!(
            decimal_to_json("12345678901234567890.12"),
            serde_json::json!("12345678901234567890.12")
        );
    }

    #[test]
    fn test_widen_f32_keeps_stored_digits() {
        assert_eq!(widen_f32(1.1), 1.1);
        assert_eq!(widen_f32(0.3), 0.3);
        assert_eq!(widen_f32(-2.5), -2.5);
        assert_eq!(widen_f32(3.0), 3.0);
        assert!(widen_f32(f32::NAN).is_nan());
        assert_eq!(widen_f32(f32::INFINITY), f64::INFINITY);
        // Plain widening would expose float4 noise
        assert_ne!(f64::from(1.1f32), 1.1);
    }

    #[test]
    fn test_bytea_hex() {
        assert_eq!(bytea_hex(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(bytea_hex(&[]), "\\x");
    }
}
