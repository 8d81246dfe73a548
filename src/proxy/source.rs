//! Data-supply seams
//!
//! The proxies never talk HTTP themselves. A [`ListSource`] or
//! [`GetSource`] is injected and returns raw JSON; Batch, Storage and ARM
//! clients implement these traits, as do the fixture source and test
//! doubles.

use super::options::ProxyOptions;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Opaque server-issued marker for the next page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContinuationToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// One page as returned by the service, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Raw entities
    #[serde(rename = "value", default)]
    pub items: Vec<Value>,
    /// Next page marker; `None` on the last page
    #[serde(rename = "odata.nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<ContinuationToken>,
}

impl RawPage {
    /// Build a page
    pub fn new(items: Vec<Value>, next_link: Option<ContinuationToken>) -> Self {
        Self { items, next_link }
    }

    /// Final page
    pub fn last(items: Vec<Value>) -> Self {
        Self::new(items, None)
    }
}

/// Paginated list call pair
#[async_trait]
pub trait ListSource<P>: Send + Sync
where
    P: Send + Sync,
{
    /// First page for the given params and options
    async fn list(&self, params: &P, options: &ProxyOptions) -> Result<RawPage>;

    /// Following page for a continuation token
    async fn list_next(&self, token: &ContinuationToken) -> Result<RawPage>;
}

/// Single entity call
#[async_trait]
pub trait GetSource<P>: Send + Sync
where
    P: Send + Sync,
{
    /// Raw entity for the given params
    async fn get(&self, params: &P, options: &ProxyOptions) -> Result<Value>;
}

/// [`GetSource`] backed by an async closure
pub struct FnGetSource<F> {
    get: F,
}

impl<F> FnGetSource<F> {
    /// Wrap a closure `(params, options) -> future of raw JSON`
    pub fn new(get: F) -> Self {
        Self { get }
    }
}

#[async_trait]
impl<P, F, Fut> GetSource<P> for FnGetSource<F>
where
    P: Clone + Send + Sync + 'static,
    F: Fn(P, ProxyOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn get(&self, params: &P, options: &ProxyOptions) -> Result<Value> {
        (self.get)(params.clone(), options.clone()).await
    }
}

/// [`ListSource`] backed by a pair of async closures
pub struct FnListSource<L, N> {
    list: L,
    list_next: N,
}

impl<L, N> FnListSource<L, N> {
    /// Wrap `list(params, options)` and `list_next(token)` closures
    pub fn new(list: L, list_next: N) -> Self {
        Self { list, list_next }
    }
}

#[async_trait]
impl<P, L, LFut, N, NFut> ListSource<P> for FnListSource<L, N>
where
    P: Clone + Send + Sync + 'static,
    L: Fn(P, ProxyOptions) -> LFut + Send + Sync,
    LFut: Future<Output = Result<RawPage>> + Send,
    N: Fn(ContinuationToken) -> NFut + Send + Sync,
    NFut: Future<Output = Result<RawPage>> + Send,
{
    async fn list(&self, params: &P, options: &ProxyOptions) -> Result<RawPage> {
        (self.list)(params.clone(), options.clone()).await
    }

    async fn list_next(&self, token: &ContinuationToken) -> Result<RawPage> {
        (self.list_next)(token.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_page_wire_format() {
        let page: RawPage = serde_json::from_value(json!({
            "value": [{"id": "a"}],
            "odata.nextLink": "https://account/pools?$skiptoken=2"
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.next_link.as_ref().map(ContinuationToken::as_str),
            Some("https://account/pools?$skiptoken=2")
        );

        let last: RawPage = serde_json::from_value(json!({"value": []})).unwrap();
        assert_eq!(last, RawPage::default());
    }

    #[tokio::test]
    async fn test_fn_get_source_forwards_params() {
        let source = FnGetSource::new(|id: String, options: ProxyOptions| async move {
            Ok::<_, crate::error::ProxyError>(json!({"id": id, "select": options.select()}))
        });
        let raw = source
            .get(&"pool-1".to_string(), &ProxyOptions::from(json!({"select": "id"})))
            .await
            .unwrap();
        assert_eq!(raw, json!({"id": "pool-1", "select": "id"}));
    }
}
