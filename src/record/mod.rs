//! Record and schema module
//!
//! Declarative normalization of heterogeneous JSON into immutable, typed
//! entities:
//! - [`Schema`] tables declare field names, coercions and defaults
//! - [`Record`] applies a schema to a raw payload and compares by value
//! - [`Model`] gives each entity a typed wrapper over its record
//!
//! Normalization is permissive: missing or malformed fields fall back to
//! their defaults, undeclared fields are dropped, nothing here fails.

mod duration;
mod immutable;
mod model;
mod schema;
mod value;

pub use duration::{format_iso8601_duration, parse_iso8601_duration};
pub use immutable::Record;
pub use model::Model;
pub use schema::{FieldDef, FieldKind, Schema, SchemaBuilder};
pub use value::FieldValue;
