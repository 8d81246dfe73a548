//! Normalized field values and the coercions that produce them

use super::duration::{format_iso8601_duration, parse_iso8601_duration};
use super::immutable::Record;
use super::schema::FieldKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A coerced field value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldValue {
    /// Missing, null, or malformed without default
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String (identifiers are already lowercased)
    Str(String),
    /// Timestamp
    DateTime(DateTime<Utc>),
    /// Duration
    Duration(Duration),
    /// Nested record
    Record(Record),
    /// List of values
    List(Vec<FieldValue>),
    /// Raw JSON
    Json(Value),
}

impl FieldValue {
    /// True for [`FieldValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// String content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert back to JSON in wire format
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::DateTime(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            FieldValue::Duration(d) => Value::String(format_iso8601_duration(*d)),
            FieldValue::Record(r) => r.to_json(),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "-"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::DateTime(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            FieldValue::Duration(d) => write!(f, "{}", humantime::format_duration(*d)),
            FieldValue::Record(r) => write!(f, "{}", r.to_json()),
            FieldValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::DateTime(v)
    }
}

impl From<Duration> for FieldValue {
    fn from(v: Duration) -> Self {
        FieldValue::Duration(v)
    }
}

impl From<Record> for FieldValue {
    fn from(v: Record) -> Self {
        FieldValue::Record(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::List(v)
    }
}

/// Coerce a raw JSON value. `None` means missing or malformed; the caller
/// falls back to the field default.
pub(crate) fn coerce(kind: &FieldKind, raw: &Value) -> Option<FieldValue> {
    if raw.is_null() {
        return None;
    }

    match kind {
        FieldKind::String => scalar_string(raw).map(FieldValue::Str),
        FieldKind::Identifier => scalar_string(raw).map(|s| FieldValue::Str(s.to_lowercase())),
        FieldKind::Integer => match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| is_exact_i64(*f)).map(|f| f as i64))
                .map(FieldValue::Int),
            Value::String(s) => s.trim().parse().ok().map(FieldValue::Int),
            _ => None,
        },
        FieldKind::Float => match raw {
            Value::Number(n) => n.as_f64().map(FieldValue::Float),
            Value::String(s) => s.trim().parse().ok().map(FieldValue::Float),
            _ => None,
        },
        FieldKind::Boolean => match raw {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(FieldValue::Bool(true)),
                "false" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        FieldKind::DateTime => raw
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|t| FieldValue::DateTime(t.with_timezone(&Utc))),
        FieldKind::Duration => raw
            .as_str()
            .and_then(parse_iso8601_duration)
            .map(FieldValue::Duration),
        FieldKind::Nested(schema) => raw
            .is_object()
            .then(|| FieldValue::Record(Record::from_json(schema(), raw))),
        FieldKind::List(inner) => raw.as_array().map(|items| {
            FieldValue::List(
                items
                    .iter()
                    .map(|item| coerce(inner, item).unwrap_or_default())
                    .collect(),
            )
        }),
        FieldKind::Json => Some(FieldValue::Json(raw.clone())),
    }
}

// Whole and inside i64 range; `as` would saturate anything larger
fn is_exact_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn scalar_string(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_scalars() {
        assert_eq!(coerce(&FieldKind::String, &json!("a")), Some(FieldValue::Str("a".into())));
        assert_eq!(coerce(&FieldKind::String, &json!(12)), Some(FieldValue::Str("12".into())));
        assert_eq!(coerce(&FieldKind::Identifier, &json!("My-Pool")), Some(FieldValue::Str("my-pool".into())));
        assert_eq!(coerce(&FieldKind::Integer, &json!(4)), Some(FieldValue::Int(4)));
        assert_eq!(coerce(&FieldKind::Integer, &json!("7")), Some(FieldValue::Int(7)));
        assert_eq!(coerce(&FieldKind::Integer, &json!(2.5)), None);
        assert_eq!(coerce(&FieldKind::Float, &json!(2.5)), Some(FieldValue::Float(2.5)));
        assert_eq!(coerce(&FieldKind::Boolean, &json!("TRUE")), Some(FieldValue::Bool(true)));
        assert_eq!(coerce(&FieldKind::Boolean, &json!(1)), None);
    }

    #[test]
    fn test_coerce_out_of_range_integer() {
        assert_eq!(coerce(&FieldKind::Integer, &json!(1e20)), None);
        assert_eq!(coerce(&FieldKind::Integer, &json!(-1e20)), None);
        assert_eq!(coerce(&FieldKind::Integer, &json!(3.0)), Some(FieldValue::Int(3)));
        assert_eq!(coerce(&FieldKind::Integer, &json!(i64::MAX)), Some(FieldValue::Int(i64::MAX)));
    }

    #[test]
    fn test_coerce_time_values() {
        let parsed = coerce(&FieldKind::DateTime, &json!("2018-03-03T04:05:44Z")).unwrap();
        match parsed {
            FieldValue::DateTime(t) => assert_eq!(t.to_rfc3339(), "2018-03-03T04:05:44+00:00"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(coerce(&FieldKind::DateTime, &json!("yesterday")), None);
        assert_eq!(
            coerce(&FieldKind::Duration, &json!("PT15M")),
            Some(FieldValue::Duration(Duration::from_secs(900)))
        );
    }

    #[test]
    fn test_coerce_list_keeps_positions() {
        let kind = FieldKind::list_of(FieldKind::Integer);
        assert_eq!(
            coerce(&kind, &json!([1, "x", 3])),
            Some(FieldValue::List(vec![FieldValue::Int(1), FieldValue::Null, FieldValue::Int(3)]))
        );
        assert_eq!(coerce(&kind, &json!("not a list")), None);
    }

    #[test]
    fn test_null_is_missing() {
        assert_eq!(coerce(&FieldKind::Json, &Value::Null), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Null.to_string(), "-");
        assert_eq!(FieldValue::Duration(Duration::from_secs(5400)).to_string(), "1h 30m");
        assert_eq!(
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::Str("a".into())]).to_string(),
            "[1, a]"
        );
    }
}
