//! Batch job

use super::{constraints_schema, metadata_item_schema, metadata_pairs};
use crate::record::{FieldKind, Model, Record, Schema};
use chrono::{DateTime, Utc};
use std::sync::OnceLock;

fn pool_info_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::builder("PoolInfo").field("poolId", FieldKind::String).build())
}

fn job_execution_info_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("JobExecutionInfo")
            .field("startTime", FieldKind::DateTime)
            .field("endTime", FieldKind::DateTime)
            .field("poolId", FieldKind::String)
            .field("terminateReason", FieldKind::String)
            .build()
    })
}

/// A job: a collection of tasks bound to a pool
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    record: Record,
}

impl Model for Job {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Job")
                .field("id", FieldKind::String)
                .field("displayName", FieldKind::String)
                .field("url", FieldKind::String)
                .field("eTag", FieldKind::String)
                .field("creationTime", FieldKind::DateTime)
                .field_with_default("state", FieldKind::String, "active")
                .field("previousState", FieldKind::String)
                .field_with_default("priority", FieldKind::Integer, 0i64)
                .field_with_default("usesTaskDependencies", FieldKind::Boolean, false)
                .field("onAllTasksComplete", FieldKind::String)
                .field("poolInfo", FieldKind::Nested(pool_info_schema))
                .field("executionInfo", FieldKind::Nested(job_execution_info_schema))
                .field("constraints", FieldKind::Nested(constraints_schema))
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

impl Job {
    /// Job id
    pub fn id(&self) -> Option<&str> {
        self.record.str("id")
    }

    /// Job state
    pub fn state(&self) -> Option<&str> {
        self.record.str("state")
    }

    /// Priority (-1000..1000)
    pub fn priority(&self) -> i64 {
        self.record.int("priority").unwrap_or(0)
    }

    /// Pool the job runs on, from the execution info when available
    pub fn pool_id(&self) -> Option<&str> {
        self.record
            .record("executionInfo")
            .and_then(|info| info.str("poolId"))
            .or_else(|| self.record.record("poolInfo")?.str("poolId"))
    }

    /// Start time
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.record.record("executionInfo")?.datetime("startTime")
    }

    /// Metadata pairs
    pub fn metadata(&self) -> Vec<(String, String)> {
        metadata_pairs(&self.record)
    }
}
