//! Local evaluation of filters against raw JSON entities

use super::builder::{Filter, FilterValue, Operator, PropFilter};
use crate::record::{Model, Record};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluates a [`Filter`] the way the service would, on data already held
/// locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterMatcher;

impl FilterMatcher {
    /// Create a matcher
    pub fn new() -> Self {
        Self
    }

    /// Test a raw JSON entity
    pub fn test(&self, filter: &Filter, entity: &Value) -> bool {
        match filter {
            Filter::Prop(prop) => self.test_prop(prop, entity),
            Filter::And(children) => children.iter().all(|f| self.test(f, entity)),
            Filter::Or(children) => {
                // An empty disjunction constrains nothing
                children.is_empty() || children.iter().any(|f| self.test(f, entity))
            }
        }
    }

    /// Test a normalized record
    pub fn test_record(&self, filter: &Filter, record: &Record) -> bool {
        self.test(filter, &record.to_json())
    }

    /// Test a typed entity
    pub fn test_model<T: Model>(&self, filter: &Filter, entity: &T) -> bool {
        self.test_record(filter, entity.record())
    }

    fn test_prop(&self, prop: &PropFilter, entity: &Value) -> bool {
        let actual = resolve(entity, &prop.path);

        match prop.op {
            Operator::Eq => compare(actual, &prop.value) == Some(Ordering::Equal),
            Operator::Ne => compare(actual, &prop.value) != Some(Ordering::Equal),
            Operator::Lt => compare(actual, &prop.value) == Some(Ordering::Less),
            Operator::Le => matches!(compare(actual, &prop.value), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt => compare(actual, &prop.value) == Some(Ordering::Greater),
            Operator::Ge => matches!(compare(actual, &prop.value), Some(Ordering::Greater | Ordering::Equal)),
            Operator::StartsWith => match (actual, &prop.value) {
                (Some(Value::String(s)), FilterValue::Str(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
        }
    }
}

/// Walk a `/` separated path through nested objects
fn resolve<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .try_fold(entity, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// Order the entity value against the literal. `None` when incomparable.
fn compare(actual: Option<&Value>, expected: &FilterValue) -> Option<Ordering> {
    match (actual, expected) {
        (None, FilterValue::Null) => Some(Ordering::Equal),
        (None, _) | (Some(_), FilterValue::Null) => None,
        (Some(Value::String(s)), FilterValue::Str(e)) => Some(s.as_str().cmp(e.as_str())),
        (Some(Value::Number(n)), FilterValue::Number(e)) => n.as_f64()?.partial_cmp(e),
        (Some(Value::String(s)), FilterValue::Number(e)) => s.parse::<f64>().ok()?.partial_cmp(e),
        (Some(Value::Bool(b)), FilterValue::Bool(e)) => Some(b.cmp(e)),
        (Some(Value::String(s)), FilterValue::DateTime(e)) => {
            let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc);
            Some(parsed.cmp(e))
        }
        _ => None,
    }
}
