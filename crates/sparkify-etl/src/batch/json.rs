//! Building batches from newline-delimited JSON records

use crate::batch::{Batch, ColumnType, Schema, Value, TIMESTAMP_FORMAT};
use crate::error::{EtlError, Result};
use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value as Json};
use std::path::Path;
use tracing::debug;

type Record = Map<String, Json>;

/// Read a JSON-lines file into a batch shaped by `schema`.
///
/// Each line is one JSON object. Fields not in the schema are ignored,
/// missing fields become null, and values are converted to the declared
/// column type (see [`value_from_json`]).
pub fn read_json_lines(path: impl AsRef<Path>, schema: &Schema) -> Result<Batch> {
    let path = path.as_ref();
    let records = serde_jsonlines::json_lines::<Record, _>(path)?
        .collect::<std::io::Result<Vec<_>>>()?;

    debug!(path = %path.display(), records = records.len(), "Read JSON lines");

    from_records(schema, &records)
}

/// Convert already-parsed JSON objects into a batch
pub fn from_records(schema: &Schema, records: &[Record]) -> Result<Batch> {
    let mut batch = Batch::empty(schema.clone());

    for (index, record) in records.iter().enumerate() {
        let row = schema
            .columns()
            .iter()
            .map(|column| {
                value_from_json(record.get(&column.name), column.ty).map_err(|reason| {
                    EtlError::InvalidRow {
                        row: index,
                        column: column.name.clone(),
                        reason,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        batch.push_row(row)?;
    }

    Ok(batch)
}

/// Convert one JSON value into a scalar of type `ty`.
///
/// - absent and `null` become [`Value::Null`]; so does `""` once the row
///   enters a batch (see [`Value::conform`])
/// - integer and float columns also accept numeric strings; blank strings
///   become null (log events carry `"userId": ""` for anonymous sessions)
/// - integer columns accept floats without a fractional part
/// - timestamp columns take epoch milliseconds or `YYYY-MM-DD HH:MM:SS[.fff]`
pub fn value_from_json(json: Option<&Json>, ty: ColumnType) -> std::result::Result<Value, String> {
    let json = match json {
        None | Some(Json::Null) => return Ok(Value::Null),
        Some(json) => json,
    };

    match ty {
        ColumnType::Text => match json {
            Json::String(s) => Ok(Value::Text(s.clone())),
            Json::Number(n) => Ok(Value::Text(n.to_string())),
            Json::Bool(b) => Ok(Value::Text(b.to_string())),
            other => Err(format!("expected text, found {}", other)),
        },
        ColumnType::Integer => match json {
            Json::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(Value::Integer)
                .ok_or_else(|| format!("expected integer, found {}", n)),
            Json::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Json::String(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().and_then(integral))
                .map(Value::Integer)
                .ok_or_else(|| format!("expected integer, found \"{}\"", s)),
            other => Err(format!("expected integer, found {}", other)),
        },
        ColumnType::Float => match json {
            Json::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("expected float, found {}", n)),
            Json::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Json::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("expected float, found \"{}\"", s)),
            other => Err(format!("expected float, found {}", other)),
        },
        ColumnType::Timestamp => match json {
            Json::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|t| Value::Timestamp(t.naive_utc()))
                .ok_or_else(|| format!("expected epoch milliseconds, found {}", n)),
            Json::String(s) => NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S"))
                .map(Value::Timestamp)
                .map_err(|_| format!("expected timestamp, found \"{}\"", s)),
            other => Err(format!("expected timestamp, found {}", other)),
        },
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
