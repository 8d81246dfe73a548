//! Immutable records
//!
//! A [`Record`] holds one coerced value per declared field of its
//! [`Schema`]. It is never mutated in place: `with`, `merge` and
//! `merge_selected` return new records sharing nothing mutable with the original.

use super::schema::{FieldDef, Schema};
use super::value::{coerce, FieldValue};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Immutable, schema-normalized value object
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    values: Arc<[FieldValue]>,
}

impl Record {
    /// Normalize a raw JSON payload.
    ///
    /// Declared fields are coerced, falling back to their default (or
    /// null) when missing or malformed. Undeclared input fields are
    /// dropped. A non-object payload yields a record of defaults.
    pub fn from_json(schema: &'static Schema, raw: &Value) -> Self {
        let object = raw.as_object();

        let values = schema
            .fields()
            .iter()
            .map(|field| normalize(schema, field, object.and_then(|o| o.get(field.name))))
            .collect();

        Self { schema, values }
    }

    /// Record with every field at its default
    pub fn empty(schema: &'static Schema) -> Self {
        Self::from_json(schema, &Value::Null)
    }

    /// Schema this record was built with
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Value of a declared field. `None` if the field is not declared.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    /// Iterate `(name, value)` in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name)
            .zip(self.values.iter())
    }

    /// String field
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Integer field
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float field
    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean field
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamp field
    pub fn datetime(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name)? {
            FieldValue::DateTime(t) => Some(*t),
            _ => None,
        }
    }

    /// Duration field
    pub fn duration(&self, name: &str) -> Option<Duration> {
        match self.get(name)? {
            FieldValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Nested record field
    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.get(name)? {
            FieldValue::Record(r) => Some(r),
            _ => None,
        }
    }

    /// List field
    pub fn list(&self, name: &str) -> Option<&[FieldValue]> {
        match self.get(name)? {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// New record with one field replaced. Undeclared names are ignored.
    ///
    /// The value is coerced to the field's kind like any raw input, so a
    /// mistyped value falls back to the field default.
    pub fn with(&self, name: &str, value: impl Into<FieldValue>) -> Self {
        let Some(index) = self.schema.index_of(name) else {
            return self.clone();
        };
        let field = &self.schema.fields()[index];
        let raw = value.into().to_json();
        let mut values = self.values.to_vec();
        values[index] = normalize(self.schema, field, Some(&raw));
        Self {
            schema: self.schema,
            values: values.into(),
        }
    }

    /// Apply a raw JSON patch. Declared fields present in `patch` are
    /// normalized as in [`from_json`](Self::from_json); absent ones keep
    /// this record's value.
    pub fn merge(&self, patch: &Value) -> Self {
        let Some(object) = patch.as_object() else {
            return self.clone();
        };

        let values = self
            .schema
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(field, old)| match object.get(field.name) {
                Some(raw) => normalize(self.schema, field, Some(raw)),
                None => old.clone(),
            })
            .collect();

        Self {
            schema: self.schema,
            values,
        }
    }

    /// Partial update for a `$select` response.
    ///
    /// Only the comma separated attributes in `select` are taken from
    /// `update`; every other field keeps this record's value. With an
    /// empty select, or a record of another schema, `update` wins whole.
    pub fn merge_selected(&self, update: &Record, select: &str) -> Self {
        if !std::ptr::eq(self.schema, update.schema) {
            return update.clone();
        }

        let selected: Vec<&str> = select
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if selected.is_empty() {
            return update.clone();
        }

        let values: Vec<FieldValue> = self
            .schema
            .fields()
            .iter()
            .zip(self.values.iter().zip(update.values.iter()))
            .map(|(field, (old, new))| {
                if selected.contains(&field.name) {
                    new.clone()
                } else {
                    old.clone()
                }
            })
            .collect();

        Self {
            schema: self.schema,
            values: values.into(),
        }
    }

    /// Serialize back to a JSON object. Null fields are omitted.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in self.iter() {
            if !value.is_null() {
                map.insert(name.to_string(), value.to_json());
            }
        }
        Value::Object(map)
    }
}

fn normalize(schema: &Schema, field: &FieldDef, raw: Option<&Value>) -> FieldValue {
    let coerced = raw.and_then(|v| coerce(&field.kind, v));

    if coerced.is_none() {
        if let Some(v) = raw.filter(|v| !v.is_null()) {
            tracing::debug!(
                model = schema.name(),
                field = field.name,
                value = %v,
                "Malformed field value, using default"
            );
        }
    }

    coerced.or_else(|| field.default.clone()).unwrap_or_default()
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldKind, Schema};
    use serde_json::json;
    use std::sync::OnceLock;

    fn owner_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Owner")
                .field("name", FieldKind::String)
                .build()
        })
    }

    fn thing_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Thing")
                .field("id", FieldKind::Identifier)
                .field_with_default("state", FieldKind::String, "active")
                .field_with_default("priority", FieldKind::Integer, 0i64)
                .field("created", FieldKind::DateTime)
                .field("owner", FieldKind::Nested(owner_schema))
                .build()
        })
    }

    #[test]
    fn test_undeclared_fields_ignored() {
        let record = Record::from_json(thing_schema(), &json!({"id": "a", "extra": 1}));
        assert!(record.get("extra").is_none());
        assert_eq!(record.to_json(), json!({"id": "a", "state": "active", "priority": 0}));
    }

    #[test]
    fn test_malformed_values_use_defaults() {
        let record = Record::from_json(
            thing_schema(),
            &json!({"id": "a", "priority": "high", "created": "not a date", "state": null}),
        );
        assert_eq!(record.int("priority"), Some(0));
        assert_eq!(record.str("state"), Some("active"));
        assert_eq!(record.get("created"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_nested_records() {
        let record = Record::from_json(
            thing_schema(),
            &json!({"id": "a", "owner": {"name": "batch", "ignored": true}}),
        );
        let owner = record.record("owner").unwrap();
        assert_eq!(owner.str("name"), Some("batch"));
        assert_eq!(owner.to_json(), json!({"name": "batch"}));
    }

    #[test]
    fn test_equality_is_by_value() {
        let raw = json!({"id": "Thing-1", "priority": 3});
        let a = Record::from_json(thing_schema(), &raw);
        let b = Record::from_json(thing_schema(), &raw);
        assert_eq!(a, b);
        assert_ne!(a, a.with("priority", 4i64));
    }

    #[test]
    fn test_with_returns_new_record() {
        let a = Record::from_json(thing_schema(), &json!({"id": "a"}));
        let b = a.with("state", "deleting");
        assert_eq!(a.str("state"), Some("active"));
        assert_eq!(b.str("state"), Some("deleting"));
        assert_eq!(a.with("nope", 1i64), a);
    }

    #[test]
    fn test_with_coerces_to_field_kind() {
        let record = Record::from_json(thing_schema(), &json!({"id": "mixed-case", "priority": 2}));
        let renamed = Record::from_json(thing_schema(), &json!({"priority": 2})).with("id", "Mixed-Case");
        assert_eq!(renamed.str("id"), Some("mixed-case"));
        assert_eq!(renamed, record);

        let bad = record.with("priority", "high");
        assert_eq!(bad.int("priority"), Some(0));
        assert_eq!(record.with("priority", "9").int("priority"), Some(9));

        let untyped = record.with("created", true);
        assert_eq!(untyped.get("created"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_merge_patches_present_fields() {
        let record = Record::from_json(thing_schema(), &json!({"id": "a", "state": "deleting", "priority": 4}));
        let merged = record.merge(&json!({"priority": "7", "state": null, "unknown": 1}));

        assert_eq!(merged.int("priority"), Some(7));
        assert_eq!(merged.str("state"), Some("active"));
        assert_eq!(merged.str("id"), Some("a"));
        assert_eq!(record.int("priority"), Some(4));
        assert_eq!(record.merge(&json!("not an object")), record);
    }

    #[test]
    fn test_merge_selected_only_touches_selected() {
        let cached = Record::from_json(thing_schema(), &json!({"id": "a", "state": "active", "priority": 5}));
        let partial = Record::from_json(thing_schema(), &json!({"id": "a", "state": "deleting"}));

        let merged = cached.merge_selected(&partial, "id, state");
        assert_eq!(merged.str("state"), Some("deleting"));
        assert_eq!(merged.int("priority"), Some(5));

        assert_eq!(cached.merge_selected(&partial, ""), partial);
    }
}
