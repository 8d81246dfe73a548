//! Filter trees and their OData rendering

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `eq`
    Eq,
    /// `ne`
    Ne,
    /// `lt`
    Lt,
    /// `le`
    Le,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
    /// `startswith(prop, value)`
    StartsWith,
}

impl Operator {
    /// OData keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::StartsWith => "startswith",
        }
    }

    /// Parse a binary comparison keyword (case-insensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            _ => None,
        }
    }
}

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal
    Number(f64),
    /// `'quoted'`
    Str(String),
    /// `datetime'2018-03-03T04:05:44Z'`
    DateTime(DateTime<Utc>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::DateTime(t) => write!(f, "datetime'{}'", t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

/// Single property comparison. Nested properties use `/` (`info/state`).
#[derive(Debug, Clone, PartialEq)]
pub struct PropFilter {
    /// Property path
    pub path: String,
    /// Operator
    pub op: Operator,
    /// Right-hand side
    pub value: FilterValue,
}

/// Filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Property comparison
    Prop(PropFilter),
    /// All children must match
    And(Vec<Filter>),
    /// Any child must match
    Or(Vec<Filter>),
}

impl Filter {
    /// Render as an OData `$filter` clause
    pub fn to_odata(&self) -> String {
        match self {
            Filter::Prop(p) => match p.op {
                Operator::StartsWith => format!("startswith({}, {})", p.path, p.value),
                op => format!("{} {} {}", p.path, op.keyword(), p.value),
            },
            Filter::And(children) => join(children, "and"),
            Filter::Or(children) => join(children, "or"),
        }
    }

    /// True when the tree holds no comparison
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Prop(_) => false,
            Filter::And(children) | Filter::Or(children) => children.iter().all(Filter::is_empty),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_odata())
    }
}

fn join(children: &[Filter], keyword: &str) -> String {
    let parts: Vec<String> = children
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| {
            let rendered = c.to_odata();
            // A nested group of the other kind needs parentheses
            match c {
                Filter::And(inner) | Filter::Or(inner) if inner.iter().filter(|f| !f.is_empty()).count() > 1 => {
                    format!("({})", rendered)
                }
                _ => rendered,
            }
        })
        .collect();
    parts.join(&format!(" {} ", keyword))
}

/// Entry point for building filters
///
/// ```
/// use batchproxy::filter::FilterBuilder;
///
/// let filter = FilterBuilder::and(vec![
///     FilterBuilder::prop("state").eq("active"),
///     FilterBuilder::prop("priority").gt(2),
/// ]);
/// assert_eq!(filter.to_odata(), "state eq 'active' and priority gt 2");
/// ```
pub struct FilterBuilder;

impl FilterBuilder {
    /// Start a comparison on a property path
    pub fn prop(path: impl Into<String>) -> PropBuilder {
        PropBuilder { path: path.into() }
    }

    /// Conjunction
    pub fn and(filters: Vec<Filter>) -> Filter {
        Filter::And(filters)
    }

    /// Disjunction
    pub fn or(filters: Vec<Filter>) -> Filter {
        Filter::Or(filters)
    }
}

/// Builder for a single property comparison
#[derive(Debug, Clone)]
pub struct PropBuilder {
    path: String,
}

impl PropBuilder {
    fn build(self, op: Operator, value: impl Into<FilterValue>) -> Filter {
        Filter::Prop(PropFilter {
            path: self.path,
            op,
            value: value.into(),
        })
    }

    /// `eq`
    pub fn eq(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::Eq, value)
    }

    /// `ne`
    pub fn ne(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::Ne, value)
    }

    /// `lt`
    pub fn lt(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::Lt, value)
    }

    /// `le`
    pub fn le(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::Le, value)
    }

    /// `gt`
    pub fn gt(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::Gt, value)
    }

    /// `ge`
    pub fn ge(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::Ge, value)
    }

    /// `startswith`
    pub fn startswith(self, value: impl Into<FilterValue>) -> Filter {
        self.build(Operator::StartsWith, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_comparisons() {
        assert_eq!(FilterBuilder::prop("id").eq("id-1").to_odata(), "id eq 'id-1'");
        assert_eq!(FilterBuilder::prop("priority").ge(2).to_odata(), "priority ge 2");
        assert_eq!(FilterBuilder::prop("ratio").lt(0.5).to_odata(), "ratio lt 0.5");
        assert_eq!(
            FilterBuilder::prop("name").startswith("some").to_odata(),
            "startswith(name, 'some')"
        );
        assert_eq!(FilterBuilder::prop("name").eq("o'neil").to_odata(), "name eq 'o''neil'");
    }

    #[test]
    fn test_render_datetime() {
        let t = Utc.with_ymd_and_hms(2018, 3, 3, 4, 5, 44).unwrap();
        assert_eq!(
            FilterBuilder::prop("creationTime").gt(t).to_odata(),
            "creationTime gt datetime'2018-03-03T04:05:44Z'"
        );
    }

    #[test]
    fn test_render_groups() {
        let filter = FilterBuilder::and(vec![
            FilterBuilder::prop("id").eq("id-1"),
            FilterBuilder::or(vec![
                FilterBuilder::prop("name").eq("name-1"),
                FilterBuilder::prop("name").eq("name-2"),
            ]),
        ]);
        assert_eq!(
            filter.to_odata(),
            "id eq 'id-1' and (name eq 'name-1' or name eq 'name-2')"
        );
    }

    #[test]
    fn test_empty_groups_are_skipped() {
        let filter = FilterBuilder::and(vec![
            FilterBuilder::or(vec![]),
            FilterBuilder::prop("state").eq("active"),
        ]);
        assert_eq!(filter.to_odata(), "state eq 'active'");
        assert!(FilterBuilder::and(vec![]).is_empty());
    }
}
