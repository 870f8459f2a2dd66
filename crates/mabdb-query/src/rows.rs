//! Conversions between engine parameters, DuckDB values and JSON

use duckdb::types::{TimeUnit, Value};
use mabdb_core::Param;
use serde_json::Value as Json;

pub(crate) fn to_sql(param: &Param) -> Value {
    match param {
        Param::Text(s) => Value::Text(s.clone()),
        Param::Integer(i) => Value::BigInt(*i),
        Param::Float(f) => Value::Double(*f),
        Param::Bool(b) => Value::Boolean(*b),
    }
}

fn float(x: f64) -> Json {
    serde_json::Number::from_f64(x).map_or(Json::Null, Json::Number)
}

fn micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// JSON rendering of a cell. Integers stay integers, timestamps and dates
/// become ISO-8601 strings, anything exotic falls back to its debug form.
pub(crate) fn to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(i) => i.into(),
        Value::SmallInt(i) => i.into(),
        Value::Int(i) => i.into(),
        Value::BigInt(i) => i.into(),
        Value::HugeInt(i) => i64::try_from(i).map_or_else(|_| Json::String(i.to_string()), Json::from),
        Value::UTinyInt(i) => i.into(),
        Value::USmallInt(i) => i.into(),
        Value::UInt(i) => i.into(),
        Value::UBigInt(i) => i.into(),
        Value::Float(f) => float(f64::from(f)),
        Value::Double(f) => float(f),
        Value::Decimal(d) => d.to_string().parse::<f64>().map_or(Json::Null, float),
        Value::Text(s) | Value::Enum(s) => Json::String(s),
        Value::Timestamp(unit, v) => chrono::DateTime::from_timestamp_micros(micros(unit, v))
            .map_or(Json::Null, |t| Json::String(t.naive_utc().to_string())),
        Value::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map_or(Json::Null, |t| Json::String(t.date_naive().to_string())),
        Value::List(items) | Value::Array(items) => {
            Json::Array(items.into_iter().map(to_json).collect())
        }
        other => Json::String(format!("{other:?}")),
    }
}
