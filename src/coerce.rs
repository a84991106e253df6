//! Column-type dispatch and string-to-typed-value conversion for key lookups,
//! plus JSON payload normalization for create/update bodies.

use crate::error::ApiError;
use crate::sql::BindValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

/// Category of a column's declared type, as reported by
/// `information_schema.columns.data_type`. Both the SQL Server spellings and
/// the PostgreSQL spellings map into the same six categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Decimal,
    Bit,
    Float,
    Text,
    Date,
}

#[derive(Error, Debug)]
pub enum CoerceError {
    #[error("El valor proporcionado no es válido para el tipo de datos {0}")]
    InvalidFormat(&'static str),
    #[error("Tipo de dato no soportado: {0}")]
    UnsupportedType(String),
}

impl From<CoerceError> for ApiError {
    fn from(e: CoerceError) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}

impl ColumnType {
    /// Classify a declared type name (case-insensitive). Unrecognized names
    /// are a hard error, not a fallback to text.
    pub fn from_declared(declared: &str) -> Result<Self, CoerceError> {
        let ty = declared.trim().to_lowercase();
        Ok(match ty.as_str() {
            "int" | "integer" | "bigint" | "smallint" | "tinyint" => ColumnType::Integer,
            "decimal" | "numeric" | "money" | "smallmoney" => ColumnType::Decimal,
            "bit" | "boolean" | "bool" => ColumnType::Bit,
            "float" | "real" | "double precision" => ColumnType::Float,
            "nvarchar" | "varchar" | "nchar" | "char" | "text" | "character varying"
            | "character" => ColumnType::Text,
            "date" | "datetime" | "datetime2" | "smalldatetime"
            | "timestamp without time zone" | "timestamp with time zone" | "timestamp" => {
                ColumnType::Date
            }
            _ => return Err(CoerceError::UnsupportedType(declared.to_string())),
        })
    }
}

/// Convert a raw path-segment string into a typed bind value for the given
/// column category. Date values are truncated to the calendar date; the
/// builder pairs them with a `CAST(col AS DATE)` filter.
pub fn coerce(ty: ColumnType, raw: &str) -> Result<BindValue, CoerceError> {
    match ty {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(BindValue::I64)
            .map_err(|_| CoerceError::InvalidFormat("entero")),
        ColumnType::Decimal => raw
            .parse::<f64>()
            .map(BindValue::F64)
            .map_err(|_| CoerceError::InvalidFormat("decimal")),
        ColumnType::Float => raw
            .parse::<f64>()
            .map(BindValue::F64)
            .map_err(|_| CoerceError::InvalidFormat("flotante")),
        ColumnType::Bit => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(BindValue::Bool(true)),
            "false" | "0" | "no" | "n" => Ok(BindValue::Bool(false)),
            _ => Err(CoerceError::InvalidFormat("booleano")),
        },
        ColumnType::Text => Ok(BindValue::String(raw.to_string())),
        ColumnType::Date => parse_iso_datetime(raw)
            .map(|dt| BindValue::Date(dt.date()))
            .ok_or(CoerceError::InvalidFormat("fecha")),
    }
}

/// Parse an ISO-8601 timestamp: RFC 3339 (trailing `Z` or numeric offset),
/// a bare datetime, or a bare calendar date (midnight).
fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?);
    }
    None
}

/// Whether a payload string should be stored as a timestamp.
pub fn looks_like_timestamp(raw: &str) -> bool {
    parse_iso_datetime(raw).is_some()
}

/// Convert an arbitrary JSON payload value into a storable bind value. This
/// path never rejects input: strings that read as ISO-8601 timestamps become
/// datetimes, objects and arrays are stored as their JSON text.
pub fn normalize_json_scalar(value: &Value) -> BindValue {
    match value {
        Value::Null => BindValue::Null,
        Value::Bool(b) => BindValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BindValue::I64(i)
            } else {
                BindValue::F64(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => match parse_iso_datetime(s) {
            Some(dt) => BindValue::DateTime(dt),
            None => BindValue::String(s.clone()),
        },
        Value::Array(_) | Value::Object(_) => BindValue::String(value.to_string()),
    }
}
