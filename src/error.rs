//! Error types for BatchProxy
//!
//! This module defines the error taxonomy surfaced by the proxy layer.
//! Transport failures and server error responses are forwarded to the
//! caller unchanged; malformed record fields are never errors (see
//! [`crate::record`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single key/value detail attached to a server error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Detail name (e.g. "Reason")
    pub key: String,
    /// Detail value
    pub value: String,
}

/// Normalized error returned by any of the Batch, Storage or ARM APIs.
///
/// Each service reports failures with a different body shape; the
/// `from_*` constructors convert them to this one structure so callers
/// can present them uniformly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// HTTP status code
    pub status: Option<u16>,
    /// HTTP status text
    pub status_text: Option<String>,
    /// Service error code (e.g. "PoolNotFound")
    pub code: Option<String>,
    /// Human readable message, without the request id/time trailer
    pub message: Option<String>,
    /// Additional details
    pub details: Vec<ErrorDetail>,
    /// Service request id
    pub request_id: Option<String>,
    /// Time the service reported the failure
    pub timestamp: Option<DateTime<Utc>>,
}

impl ServerError {
    /// Create a bare server error with a status and code
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: Some(code.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Build from a Batch error body.
    ///
    /// Batch nests the message as `{"lang": .., "value": ..}` and appends
    /// `RequestId:` and `Time:` lines to it.
    pub fn from_batch_body(status: u16, body: &Value) -> Self {
        let raw_message = match body.get("message") {
            Some(Value::Object(map)) => map.get("value").and_then(Value::as_str),
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        };
        let parsed = ParsedMessage::parse(raw_message);

        let details = body
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(detail_from_value).collect())
            .unwrap_or_default();

        Self {
            status: Some(status),
            status_text: None,
            code: str_field(body, "code"),
            message: parsed.message,
            details,
            request_id: parsed.request_id,
            timestamp: parsed.timestamp,
        }
    }

    /// Build from a Storage error body (`code`, `message`, `requestId`)
    pub fn from_storage_body(status: u16, body: &Value) -> Self {
        let parsed = ParsedMessage::parse(body.get("message").and_then(Value::as_str));

        Self {
            status: Some(status),
            status_text: None,
            code: str_field(body, "code"),
            message: parsed.message,
            details: Vec::new(),
            request_id: str_field(body, "requestId").or(parsed.request_id),
            timestamp: parsed.timestamp,
        }
    }

    /// Build from an ARM error response (`{"error": {"code", "message"}}`).
    ///
    /// ARM carries the request id and date in response headers rather than
    /// in the body, so they are passed in separately.
    pub fn from_arm_body(
        status: u16,
        status_text: Option<&str>,
        body: &Value,
        request_id: Option<&str>,
        date: Option<&str>,
    ) -> Self {
        let error = body.get("error");
        let timestamp = date.and_then(|d| {
            DateTime::parse_from_rfc2822(d)
                .or_else(|_| DateTime::parse_from_rfc3339(d))
                .ok()
                .map(|t| t.with_timezone(&Utc))
        });

        Self {
            status: Some(status),
            status_text: status_text.map(str::to_string),
            code: error.and_then(|e| str_field(e, "code")),
            message: error.and_then(|e| str_field(e, "message")),
            details: Vec::new(),
            request_id: request_id.map(str::to_string),
            timestamp,
        }
    }

    /// Render the details as `key: value` lines
    pub fn details_to_string(&self) -> String {
        self.details
            .iter()
            .map(|d| format!("{}: {}", d.key, d.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.map(|s| s.to_string());
        let parts: Vec<&str> = [status.as_deref(), self.status_text.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        write!(f, "{}", parts.join(" - "))?;
        if !self.details.is_empty() {
            write!(f, "\n{}", self.details_to_string())?;
        }
        Ok(())
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn detail_from_value(value: &Value) -> Option<ErrorDetail> {
    Some(ErrorDetail {
        key: value.get("key").and_then(Value::as_str)?.to_string(),
        value: value
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Message split into its first line and the `RequestId:`/`Time:` trailer
struct ParsedMessage {
    message: Option<String>,
    request_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl ParsedMessage {
    fn parse(full: Option<&str>) -> Self {
        let Some(full) = full.filter(|m| !m.is_empty()) else {
            return Self {
                message: None,
                request_id: None,
                timestamp: None,
            };
        };

        let mut lines = full.lines();
        let message = lines.next().map(str::to_string);
        let request_id = lines.next().and_then(value_from_line);
        let timestamp = lines
            .next()
            .and_then(value_from_line)
            .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
            .map(|t| t.with_timezone(&Utc));

        Self {
            message,
            request_id,
            timestamp,
        }
    }
}

/// Value after the first `:` of a `Name:value` line. Colons inside the
/// value (timestamps) are kept.
fn value_from_line(line: &str) -> Option<String> {
    line.split_once(':').map(|(_, value)| value.to_string())
}

/// Main error type for proxy operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Network or transport failure (timeout, connection reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Structured error response returned by the service
    #[error("Server error: {0}")]
    Server(ServerError),

    /// Entity does not exist in the data source
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Operation cancelled through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// The server broke the continuation token contract
    #[error("Pagination error: {0}")]
    Pagination(String),

    /// OData filter could not be parsed
    #[error("Invalid filter '{input}': {message}")]
    InvalidFilter { input: String, message: String },

    /// Command registration or dispatch failure
    #[error("Command error: {0}")]
    Command(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading a local data source
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProxyError>,
    },
}

impl ProxyError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid filter error
    pub fn invalid_filter(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server(e) => e.status,
            Self::NotFound(_) => Some(404),
            Self::WithContext { source, .. } => source.status(),
            _ => None,
        }
    }

    /// True for 404-style failures
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this error is worth retrying by the caller.
    ///
    /// The proxy layer itself never retries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server(e) => e.status.is_some_and(|s| s >= 500 || s == 429),
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl From<ServerError> for ProxyError {
    fn from(err: ServerError) -> Self {
        ProxyError::Server(err)
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Result type alias for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| ProxyError::io(path, e))
    }
}
