//! Typed entities on top of records

use super::immutable::Record;
use super::schema::Schema;
use serde_json::Value;

/// A typed entity backed by a [`Record`].
///
/// Implementors declare their schema once and wrap the normalized record;
/// equality of two entities is equality of their records.
pub trait Model: Sized + Send + Sync + 'static {
    /// Field table for this entity
    fn schema() -> &'static Schema;

    /// Wrap an already normalized record
    fn from_record(record: Record) -> Self;

    /// Underlying record
    fn record(&self) -> &Record;

    /// Normalize a raw payload into this entity
    fn from_json(raw: &Value) -> Self {
        Self::from_record(Record::from_json(Self::schema(), raw))
    }

    /// Entity name used in logs
    fn model_name() -> &'static str {
        Self::schema().name()
    }

    /// Serialize back to wire format
    fn to_json(&self) -> Value {
        self.record().to_json()
    }
}
