//! Entity models
//!
//! Batch and Storage entities declared as explicit schema tables. Field
//! names match the REST wire format.

mod job;
mod pool;
mod storage_account;
mod task;

pub use job::Job;
pub use pool::Pool;
pub use storage_account::StorageAccount;
pub use task::Task;

use crate::record::{FieldKind, Schema};
use std::sync::OnceLock;

/// `{name, value}` metadata pair shared by pools and jobs
pub fn metadata_item_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("MetadataItem")
            .field("name", FieldKind::String)
            .field("value", FieldKind::String)
            .build()
    })
}

/// Execution constraints shared by jobs and tasks
pub fn constraints_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("Constraints")
            .field("maxWallClockTime", FieldKind::Duration)
            .field("retentionTime", FieldKind::Duration)
            .field_with_default("maxTaskRetryCount", FieldKind::Integer, 0i64)
            .build()
    })
}

/// Metadata list as `(name, value)` pairs
pub(crate) fn metadata_pairs(record: &crate::record::Record) -> Vec<(String, String)> {
    record
        .list("metadata")
        .unwrap_or_default()
        .iter()
        .filter_map(|item| match item {
            crate::record::FieldValue::Record(r) => Some((
                r.str("name")?.to_string(),
                r.str("value").unwrap_or_default().to_string(),
            )),
            _ => None,
        })
        .collect()
}
