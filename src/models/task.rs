//! Batch task

use super::constraints_schema;
use crate::record::{FieldKind, Model, Record, Schema};
use std::sync::OnceLock;
use std::time::Duration;

fn task_execution_info_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("TaskExecutionInfo")
            .field("startTime", FieldKind::DateTime)
            .field("endTime", FieldKind::DateTime)
            .field("exitCode", FieldKind::Integer)
            .field_with_default("retryCount", FieldKind::Integer, 0i64)
            .field_with_default("requeueCount", FieldKind::Integer, 0i64)
            .field("result", FieldKind::String)
            .build()
    })
}

/// A task inside a job
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    record: Record,
}

impl Model for Task {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Task")
                .field("id", FieldKind::String)
                .field("displayName", FieldKind::String)
                .field("url", FieldKind::String)
                .field("creationTime", FieldKind::DateTime)
                .field_with_default("state", FieldKind::String, "active")
                .field("stateTransitionTime", FieldKind::DateTime)
                .field("commandLine", FieldKind::String)
                .field("executionInfo", FieldKind::Nested(task_execution_info_schema))
                .field("constraints", FieldKind::Nested(constraints_schema))
                .field("dependsOn", FieldKind::Json)
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

impl Task {
    /// Task id
    pub fn id(&self) -> Option<&str> {
        self.record.str("id")
    }

    /// Task state
    pub fn state(&self) -> Option<&str> {
        self.record.str("state")
    }

    /// Command line
    pub fn command_line(&self) -> Option<&str> {
        self.record.str("commandLine")
    }

    /// Exit code once the task completed
    pub fn exit_code(&self) -> Option<i64> {
        self.record.record("executionInfo")?.int("exitCode")
    }

    /// Wall clock time between start and end
    pub fn run_time(&self) -> Option<Duration> {
        let info = self.record.record("executionInfo")?;
        let elapsed = info.datetime("endTime")? - info.datetime("startTime")?;
        elapsed.to_std().ok()
    }

    /// True once the task reached `completed`
    pub fn is_completed(&self) -> bool {
        self.state() == Some("completed")
    }
}
