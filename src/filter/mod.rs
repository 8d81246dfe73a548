//! OData filter module
//!
//! Builds `$filter` clauses for list calls, parses them back, and
//! evaluates them locally against raw entities.

mod builder;
mod matcher;
mod parser;

pub use builder::{Filter, FilterBuilder, FilterValue, Operator, PropBuilder, PropFilter};
pub use matcher::FilterMatcher;
