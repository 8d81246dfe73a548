//! Request options normalization
//!
//! [`ProxyOptions`] splits caller supplied attributes into the OData
//! `select` and `filter` clauses plus everything else, while remembering
//! the exact input it was built from.

use crate::filter::Filter;
use serde_json::{Map, Value};

const SELECT_KEY: &str = "select";
const FILTER_KEY: &str = "filter";
const MAX_RESULTS_KEY: &str = "maxResults";

/// Canonical request configuration for list and get calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyOptions {
    select: Option<String>,
    filter: Option<String>,
    attributes: Map<String, Value>,
    original: Map<String, Value>,
}

impl ProxyOptions {
    /// Normalize a plain attributes object.
    ///
    /// `select` and `filter` are taken out of the attribute bag; a
    /// non-string or blank value for either is ignored rather than rejected.
    pub fn new(original: Map<String, Value>) -> Self {
        let mut attributes = original.clone();
        let select = attributes.remove(SELECT_KEY).and_then(clause);
        let filter = attributes.remove(FILTER_KEY).and_then(clause);

        Self {
            select,
            filter,
            attributes,
            original,
        }
    }

    /// Normalize any JSON value; non-objects give empty options
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    /// `$select` clause
    pub fn select(&self) -> Option<&str> {
        self.select.as_deref()
    }

    /// `$filter` clause
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Every attribute other than `select` and `filter`
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// The exact input these options were built from
    pub fn original(&self) -> &Map<String, Value> {
        &self.original
    }

    /// Single attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Page size requested through `maxResults`
    pub fn max_results(&self) -> Option<u64> {
        self.attributes.get(MAX_RESULTS_KEY).and_then(Value::as_u64)
    }

    /// Selected attribute names, trimmed
    pub fn selected_fields(&self) -> Option<Vec<&str>> {
        self.select.as_deref().map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect()
        })
    }

    /// True when nothing at all was supplied
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Patch: keys in `other` override keys in `self`
    pub fn merge(&self, other: impl Into<ProxyOptions>) -> Self {
        let other = other.into();
        let mut merged = self.original.clone();
        for (key, value) in other.original {
            merged.insert(key, value);
        }
        Self::new(merged)
    }

    /// Copy with a `select` clause
    pub fn with_select(&self, select: impl Into<String>) -> Self {
        self.with_attribute(SELECT_KEY, Value::String(select.into()))
    }

    /// Copy with a `filter` clause rendered from a filter tree.
    /// An empty tree clears any existing clause.
    pub fn with_filter(&self, filter: &Filter) -> Self {
        if filter.is_empty() {
            let mut original = self.original.clone();
            original.remove(FILTER_KEY);
            return Self::new(original);
        }
        self.with_attribute(FILTER_KEY, Value::String(filter.to_odata()))
    }

    /// Copy with one attribute set
    pub fn with_attribute(&self, key: impl Into<String>, value: Value) -> Self {
        let mut original = self.original.clone();
        original.insert(key.into(), value);
        Self::new(original)
    }
}

fn clause(value: Value) -> Option<String> {
    value.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string)
}

impl From<Map<String, Value>> for ProxyOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(map)
    }
}

impl From<Value> for ProxyOptions {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

// Rebuilt from the plain `original`, never nesting the source instance
impl From<&ProxyOptions> for ProxyOptions {
    fn from(options: &ProxyOptions) -> Self {
        Self::new(options.original.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterBuilder;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_splits_select_from_attributes() {
        let options = ProxyOptions::from(json!({"select": "id,state", "foo": "bar"}));
        assert_eq!(options.select(), Some("id,state"));
        assert_eq!(options.filter(), None);
        assert_eq!(options.attributes(), &map(json!({"foo": "bar"})));
        assert_eq!(options.original(), &map(json!({"select": "id,state", "foo": "bar"})));
    }

    #[test]
    fn test_from_other_options_keeps_plain_original() {
        let source = ProxyOptions::from(json!({"select": "id", "filter": "state eq 'active'", "maxResults": 10}));
        let copy = ProxyOptions::from(&source);

        assert_eq!(copy.original(), source.original());
        assert_eq!(copy.select(), Some("id"));
        assert_eq!(copy.filter(), Some("state eq 'active'"));
        assert_eq!(copy.max_results(), Some(10));
        assert_eq!(copy, source);
    }

    #[test]
    fn test_empty_defaults() {
        let options = ProxyOptions::default();
        assert!(options.is_empty());
        assert_eq!(options.select(), None);
        assert!(options.attributes().is_empty());
        assert_eq!(ProxyOptions::from(json!("nope")), ProxyOptions::default());
    }

    #[test]
    fn test_non_string_clauses_ignored() {
        let options = ProxyOptions::from(json!({"select": 3, "filter": null, "a": 1}));
        assert_eq!(options.select(), None);
        assert_eq!(options.filter(), None);
        assert_eq!(options.attributes(), &map(json!({"a": 1})));
    }

    #[test]
    fn test_merge_overrides() {
        let base = ProxyOptions::from(json!({"select": "id", "maxResults": 10}));
        let merged = base.merge(json!({"maxResults": 50, "filter": "state eq 'active'"}));
        assert_eq!(merged.select(), Some("id"));
        assert_eq!(merged.max_results(), Some(50));
        assert_eq!(merged.filter(), Some("state eq 'active'"));
        // base untouched
        assert_eq!(base.max_results(), Some(10));
    }

    #[test]
    fn test_with_filter_and_selected_fields() {
        let options = ProxyOptions::default()
            .with_select("id, state ,")
            .with_filter(&FilterBuilder::prop("state").eq("active"));
        assert_eq!(options.selected_fields(), Some(vec!["id", "state"]));
        assert_eq!(options.filter(), Some("state eq 'active'"));
    }

    #[test]
    fn test_empty_filter_clears_clause() {
        let options = ProxyOptions::from(json!({"filter": "state eq 'active'", "maxResults": 5}));
        let cleared = options.with_filter(&FilterBuilder::and(vec![]));
        assert_eq!(cleared.filter(), None);
        assert!(!cleared.original().contains_key("filter"));
        assert_eq!(cleared.max_results(), Some(5));

        let blank = ProxyOptions::from(json!({"filter": "  ", "select": ""}));
        assert_eq!(blank.filter(), None);
        assert_eq!(blank.select(), None);
    }
}
