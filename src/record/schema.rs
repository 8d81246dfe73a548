//! Field schema declarations
//!
//! A [`Schema`] is the explicit table a model declares: field name,
//! coercion kind and optional default. It replaces runtime metadata
//! attached to classes; every model builds its table once and hands out a
//! `&'static Schema`.

use super::value::FieldValue;

/// How a raw JSON value is coerced into a [`FieldValue`]
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Any scalar rendered as a string
    String,
    /// String normalized to lowercase, for case-insensitive resource ids
    Identifier,
    /// Signed integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean (also accepts "true"/"false")
    Boolean,
    /// RFC 3339 timestamp
    DateTime,
    /// ISO 8601 duration
    Duration,
    /// Nested object normalized with its own schema
    Nested(fn() -> &'static Schema),
    /// Array whose elements share one kind
    List(Box<FieldKind>),
    /// Raw JSON kept as-is
    Json,
}

impl FieldKind {
    /// List of the given element kind
    pub fn list_of(kind: FieldKind) -> Self {
        FieldKind::List(Box::new(kind))
    }
}

/// A single declared field
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name, identical to the wire name
    pub name: &'static str,
    /// Coercion applied to the raw value
    pub kind: FieldKind,
    /// Value used when the raw value is missing or malformed
    pub default: Option<FieldValue>,
}

/// Declared fields of one model, in declaration order
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Start declaring a schema
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    /// Model name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared fields in order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Position of a declared field
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builder for [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Declare a field without default
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.push(FieldDef {
            name,
            kind,
            default: None,
        });
        self
    }

    /// Declare a field with a default value
    pub fn field_with_default(
        mut self,
        name: &'static str,
        kind: FieldKind,
        default: impl Into<FieldValue>,
    ) -> Self {
        self.push(FieldDef {
            name,
            kind,
            default: Some(default.into()),
        });
        self
    }

    /// Finish the schema
    pub fn build(self) -> Schema {
        Schema {
            name: self.name,
            fields: self.fields,
        }
    }

    // Redeclaring a name replaces the earlier declaration in place
    fn push(&mut self, def: FieldDef) {
        match self.fields.iter_mut().find(|f| f.name == def.name) {
            Some(existing) => *existing = def,
            None => self.fields.push(def),
        }
    }
}
