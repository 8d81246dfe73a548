//! Batch pool

use super::{metadata_item_schema, metadata_pairs};
use crate::record::{FieldKind, Model, Record, Schema};
use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use std::time::Duration;

fn start_task_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("StartTask")
            .field("commandLine", FieldKind::String)
            .field_with_default("waitForSuccess", FieldKind::Boolean, true)
            .field_with_default("maxTaskRetryCount", FieldKind::Integer, 0i64)
            .build()
    })
}

/// A pool of compute nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    record: Record,
}

impl Model for Pool {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Pool")
                .field("id", FieldKind::String)
                .field("displayName", FieldKind::String)
                .field("url", FieldKind::String)
                .field("eTag", FieldKind::String)
                .field("lastModified", FieldKind::DateTime)
                .field("creationTime", FieldKind::DateTime)
                .field_with_default("state", FieldKind::String, "active")
                .field("allocationState", FieldKind::String)
                .field("vmSize", FieldKind::String)
                .field("resizeTimeout", FieldKind::Duration)
                .field_with_default("currentDedicatedNodes", FieldKind::Integer, 0i64)
                .field_with_default("targetDedicatedNodes", FieldKind::Integer, 0i64)
                .field_with_default("currentLowPriorityNodes", FieldKind::Integer, 0i64)
                .field_with_default("targetLowPriorityNodes", FieldKind::Integer, 0i64)
                .field_with_default("enableAutoScale", FieldKind::Boolean, false)
                .field("autoScaleFormula", FieldKind::String)
                .field_with_default("taskSlotsPerNode", FieldKind::Integer, 1i64)
                .field("startTask", FieldKind::Nested(start_task_schema))
                .field("metadata", FieldKind::list_of(FieldKind::Nested(metadata_item_schema)))
                .build()
        })
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }
}

impl Pool {
    /// Pool id
    pub fn id(&self) -> Option<&str> {
        self.record.str("id")
    }

    /// Display name
    pub fn display_name(&self) -> Option<&str> {
        self.record.str("displayName")
    }

    /// Pool state (`active`, `deleting`)
    pub fn state(&self) -> Option<&str> {
        self.record.str("state")
    }

    /// VM size
    pub fn vm_size(&self) -> Option<&str> {
        self.record.str("vmSize")
    }

    /// Creation time
    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.record.datetime("creationTime")
    }

    /// Resize timeout
    pub fn resize_timeout(&self) -> Option<Duration> {
        self.record.duration("resizeTimeout")
    }

    /// Dedicated plus low priority nodes currently allocated
    pub fn current_nodes(&self) -> i64 {
        self.record.int("currentDedicatedNodes").unwrap_or(0)
            + self.record.int("currentLowPriorityNodes").unwrap_or(0)
    }

    /// Dedicated plus low priority nodes requested
    pub fn target_nodes(&self) -> i64 {
        self.record.int("targetDedicatedNodes").unwrap_or(0)
            + self.record.int("targetLowPriorityNodes").unwrap_or(0)
    }

    /// Whether autoscale is on
    pub fn auto_scale(&self) -> bool {
        self.record.bool("enableAutoScale").unwrap_or(false)
    }

    /// Start task command line
    pub fn start_task_command(&self) -> Option<&str> {
        self.record.record("startTask")?.str("commandLine")
    }

    /// Metadata pairs
    pub fn metadata(&self) -> Vec<(String, String)> {
        metadata_pairs(&self.record)
    }
}
