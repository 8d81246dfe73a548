//! JSON-file backed data source
//!
//! Serves a fixed set of raw entities through the [`ListSource`] and
//! [`GetSource`] seams, paging them the way the Batch service does:
//! a filter and projection are applied to the full set, the result is
//! split into pages, and every page but the last carries a continuation
//! token.

use crate::error::{IoResultExt, ProxyError, Result, ServerError};
use crate::filter::{Filter, FilterMatcher};
use crate::proxy::{ContinuationToken, GetSource, ListSource, ProxyOptions, RawPage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Page size used when neither the file nor the caller sets one
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Listings kept open at once; the oldest is dropped past this
pub const MAX_PENDING_QUERIES: usize = 64;

/// On-disk layout; a bare array is accepted too
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureFile {
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default = "default_unique_field")]
    unique_field: String,
    items: Vec<Value>,
}

fn default_unique_field() -> String {
    "id".to_string()
}

/// Remaining result set of a listing in progress
#[derive(Debug)]
struct PendingQuery {
    items: Vec<Value>,
    offset: usize,
    page_size: usize,
    seq: u64,
}

/// In-memory entity store implementing the list and get seams
#[derive(Debug)]
pub struct FixtureSource {
    items: Vec<Value>,
    page_size: usize,
    unique_field: String,
    pending: Mutex<HashMap<ContinuationToken, PendingQuery>>,
    next_query: AtomicU64,
}

impl FixtureSource {
    /// Serve `items` in pages of `page_size`
    pub fn from_items(items: Vec<Value>, page_size: usize) -> Self {
        Self {
            items,
            page_size: page_size.max(1),
            unique_field: default_unique_field(),
            pending: Mutex::new(HashMap::new()),
            next_query: AtomicU64::new(0),
        }
    }

    /// Load a fixture file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let source = Self::from_json_str(&content)
            .map_err(|e| e.with_context(format!("reading fixture {}", path.display())))?;

        tracing::debug!(
            path = %path.display(),
            items = source.items.len(),
            page_size = source.page_size,
            "Loaded fixture"
        );
        Ok(source)
    }

    /// Parse fixture content
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        let file = match value {
            Value::Array(items) => FixtureFile {
                page_size: None,
                unique_field: default_unique_field(),
                items,
            },
            other => serde_json::from_value(other)?,
        };

        let mut source = Self::from_items(file.items, file.page_size.unwrap_or(DEFAULT_PAGE_SIZE));
        source.unique_field = file.unique_field;
        Ok(source)
    }

    /// Override the page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of entities held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the fixture holds nothing
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Field used to look entities up
    pub fn unique_field(&self) -> &str {
        &self.unique_field
    }

    /// Listings started but not yet read to the end
    pub fn pending_queries(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn find(&self, id: &str) -> Option<&Value> {
        self.items.iter().find(|item| {
            item.get(&self.unique_field)
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case(id))
        })
    }

    fn take_page(&self, mut query: PendingQuery) -> Result<RawPage> {
        let end = (query.offset + query.page_size).min(query.items.len());
        let items = query.items[query.offset..end].to_vec();
        if end >= query.items.len() {
            return Ok(RawPage::last(items));
        }

        let seq = self.next_query.fetch_add(1, Ordering::Relaxed);
        let token = ContinuationToken::new(format!("page-{}-{}", seq, end));
        query.offset = end;
        query.seq = seq;

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| ProxyError::Transport("fixture state poisoned".into()))?;
        pending.insert(token.clone(), query);
        while pending.len() > MAX_PENDING_QUERIES {
            let Some(oldest) = pending.iter().min_by_key(|(_, q)| q.seq).map(|(t, _)| t.clone()) else {
                break;
            };
            tracing::debug!(token = %oldest, "Dropping abandoned listing");
            pending.remove(&oldest);
        }
        Ok(RawPage::new(items, Some(token)))
    }
}

/// Keep only the selected top-level attributes
fn project(item: &Value, fields: &[&str]) -> Value {
    match item {
        Value::Object(map) => {
            let projected: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Value::Object(projected)
        }
        other => other.clone(),
    }
}

fn apply_select(item: &Value, options: &ProxyOptions) -> Value {
    match options.selected_fields() {
        Some(fields) if !fields.is_empty() => project(item, &fields),
        _ => item.clone(),
    }
}

#[async_trait]
impl<P> ListSource<P> for FixtureSource
where
    P: Send + Sync,
{
    async fn list(&self, _params: &P, options: &ProxyOptions) -> Result<RawPage> {
        let filter = options.filter().map(Filter::parse).transpose()?;
        let matcher = FilterMatcher::new();

        let items: Vec<Value> = self
            .items
            .iter()
            .filter(|item| filter.as_ref().map_or(true, |f| matcher.test(f, item)))
            .map(|item| apply_select(item, options))
            .collect();

        let page_size = options
            .max_results()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(self.page_size)
            .max(1);

        tracing::trace!(matched = items.len(), page_size, "Fixture list");
        self.take_page(PendingQuery {
            items,
            offset: 0,
            page_size,
            seq: 0,
        })
    }

    async fn list_next(&self, token: &ContinuationToken) -> Result<RawPage> {
        let query = self
            .pending
            .lock()
            .map_err(|_| ProxyError::Transport("fixture state poisoned".into()))?
            .remove(token)
            .ok_or_else(|| {
                ProxyError::Server(ServerError::new(
                    400,
                    "InvalidContinuationToken",
                    format!("Unknown continuation token '{}'", token),
                ))
            })?;
        self.take_page(query)
    }
}

#[async_trait]
impl GetSource<String> for FixtureSource {
    async fn get(&self, id: &String, options: &ProxyOptions) -> Result<Value> {
        match self.find(id) {
            Some(item) => Ok(apply_select(item, options)),
            None => Err(ProxyError::Server(ServerError::new(
                404,
                "EntityNotFound",
                format!("The specified entity '{}' does not exist.", id),
            ))),
        }
    }
}
