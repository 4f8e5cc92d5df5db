//! Type coercion rules: raw lexical values to typed [`Value`]s.
//!
//! All functions here are pure. Failures are reported as a short message; the row materializer
//! attaches row/field context and turns them into [`IngestionError::Coercion`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::IngestionError;
use crate::types::Value;

use super::hints::TypeHint;

const MYSQL_DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Source dialect. Selects the temporal layout used when coercing [`TypeHint::Time`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Dialect {
    /// RFC 3339 timestamps (`2021-05-01T12:00:00Z`).
    #[default]
    PostgreSql,
    /// `YYYY-MM-DD HH:MM:SS` timestamps, interpreted as UTC.
    MySql,
}

impl Dialect {
    /// Human-readable description of the dialect's timestamp layout.
    pub fn time_layout(self) -> &'static str {
        match self {
            Self::PostgreSql => "RFC 3339",
            Self::MySql => "YYYY-MM-DD HH:MM:SS",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostgreSql => f.write_str("postgres"),
            Self::MySql => f.write_str("mysql"),
        }
    }
}

impl FromStr for Dialect {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::PostgreSql),
            "mysql" | "mariadb" => Ok(Self::MySql),
            _ => Err(IngestionError::InvalidDialect { name: s.to_string() }),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = IngestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-call coercion settings, threaded from the entrypoint down to every cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CoercionRules {
    pub dialect: Dialect,
    /// Accept `true`/`false` style tokens for [`TypeHint::Int64`] columns (query path).
    pub bool_tokens_as_int: bool,
}

/// Coerce one non-null lexical value according to `hint`.
pub(crate) fn coerce(raw: &str, hint: &TypeHint, rules: &CoercionRules) -> Result<Value, String> {
    match hint {
        TypeHint::Utf8 => Ok(Value::Utf8(raw.to_string())),
        TypeHint::Float64 => parse_float64(raw).map(Value::Float64),
        TypeHint::Int64 => match parse_int64(raw) {
            Ok(n) => Ok(Value::Int64(n)),
            Err(e) if rules.bool_tokens_as_int => parse_bool_token(raw).map(Value::Int64).ok_or(e),
            Err(e) => Err(e),
        },
        TypeHint::Bool => parse_bool_token(raw)
            .map(Value::Int64)
            .ok_or_else(|| "expected boolean token (true/false/1/0)".to_string()),
        TypeHint::Time => parse_time(raw, rules.dialect).map(Value::Time),
        TypeHint::Generic(_) => Ok(Value::generic(raw.to_string())),
        TypeHint::Custom(converter) => converter.convert(raw).map_err(|e| e.to_string()),
    }
}

/// Parse a 64-bit float.
///
/// Literals outside the finite `f64` range are rejected rather than rounded to infinity; only an
/// explicit `inf`/`infinity` token (optionally signed) yields an infinite value.
pub fn parse_float64(raw: &str) -> Result<f64, String> {
    let v = raw.parse::<f64>().map_err(|e| e.to_string())?;
    if v.is_infinite() && !is_infinity_token(raw) {
        return Err("value out of range for float64".to_string());
    }
    Ok(v)
}

fn is_infinity_token(raw: &str) -> bool {
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

/// Parse a base-10 64-bit signed integer.
pub fn parse_int64(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>().map_err(|e| e.to_string())
}

/// Map a boolean-like token to `1`/`0`.
///
/// Accepted: `true`, `TRUE`, `True`, `1` and `false`, `FALSE`, `False`, `0`.
pub fn parse_bool_token(raw: &str) -> Option<i64> {
    match raw {
        "true" | "TRUE" | "True" | "1" => Some(1),
        "false" | "FALSE" | "False" | "0" => Some(0),
        _ => None,
    }
}

/// Parse a timestamp using the dialect's layout, falling back to integer Unix seconds.
pub fn parse_time(raw: &str, dialect: Dialect) -> Result<DateTime<Utc>, String> {
    let parsed = match dialect {
        Dialect::PostgreSql => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok(),
        Dialect::MySql => NaiveDateTime::parse_from_str(raw, MYSQL_DATETIME_LAYOUT)
            .map(|t| t.and_utc())
            .ok(),
    };
    if let Some(t) = parsed {
        return Ok(t);
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| format!("expected {} timestamp or unix seconds", dialect.time_layout()))
}
