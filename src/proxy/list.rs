//! Paginated list proxy
//!
//! [`ListProxy`] presents a remote listing as a sequence of pages. The
//! first fetch calls `list` with the normalized options; each following
//! fetch calls `list_next` with the continuation token kept from the
//! previous page. Once the server stops returning a token the proxy is
//! exhausted and further fetches return empty pages without a call.
//!
//! Advancing the cursor takes `&mut self`, so only one fetch can be in
//! flight per proxy.

use super::options::ProxyOptions;
use super::source::{ContinuationToken, ListSource, RawPage};
use crate::error::{ProxyError, Result};
use crate::record::Model;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A page of normalized entities
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse<T> {
    /// Entities in server order
    pub items: Vec<T>,
    /// Token for the following page, `None` when this was the last one
    pub next_link: Option<ContinuationToken>,
}

impl<T> ListResponse<T> {
    /// Response carrying nothing
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_link: None,
        }
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no entity was returned
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cursor state
#[derive(Debug, Default)]
struct ListCursor {
    started: bool,
    next_link: Option<ContinuationToken>,
    consumed: HashSet<ContinuationToken>,
}

impl ListCursor {
    fn has_more(&self) -> bool {
        !self.started || self.next_link.is_some()
    }

    fn pages_fetched(&self) -> usize {
        usize::from(self.started) + self.consumed.len()
    }
}

/// Stateful cursor over a paginated listing
pub struct ListProxy<T, P> {
    source: Arc<dyn ListSource<P>>,
    params: P,
    options: ProxyOptions,
    cursor: ListCursor,
    _model: PhantomData<fn() -> T>,
}

impl<T, P> ListProxy<T, P>
where
    T: Model,
    P: Send + Sync,
{
    /// Bind a list source with its params and options
    pub fn new(source: Arc<dyn ListSource<P>>, params: P, options: impl Into<ProxyOptions>) -> Self {
        Self {
            source,
            params,
            options: options.into(),
            cursor: ListCursor::default(),
            _model: PhantomData,
        }
    }

    /// Params the listing is bound to
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Current options
    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// True until the server reports the last page
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.cursor.pages_fetched()
    }

    /// Replace the options and start over from the first page
    pub fn set_options(&mut self, options: impl Into<ProxyOptions>) {
        self.options = options.into();
        self.reset();
    }

    /// Replace the params and start over from the first page
    pub fn set_params(&mut self, params: P) {
        self.params = params;
        self.reset();
    }

    /// Forget the cursor; the next fetch calls `list` again
    pub fn reset(&mut self) {
        tracing::trace!(model = T::model_name(), "Resetting list cursor");
        self.cursor = ListCursor::default();
    }

    /// Fetch the next page.
    ///
    /// After exhaustion this returns an empty response without calling
    /// the source. A failed call leaves the cursor where it was, so the
    /// same fetch can be retried.
    pub async fn fetch_next(&mut self) -> Result<ListResponse<T>> {
        if !self.cursor.has_more() {
            return Ok(ListResponse::empty());
        }

        let page = self.request_page().await?;
        self.advance(page)
    }

    /// [`fetch_next`](Self::fetch_next) abandoned when `cancel` fires.
    ///
    /// The in-flight source call is dropped and the cursor is unchanged.
    pub async fn fetch_next_with_cancel(&mut self, cancel: &CancellationToken) -> Result<ListResponse<T>> {
        if !self.cursor.has_more() {
            return Ok(ListResponse::empty());
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(model = T::model_name(), "List fetch cancelled");
                return Err(ProxyError::Cancelled);
            }
            page = self.request_page() => page?,
        };
        self.advance(page)
    }

    /// Fetch every remaining page and return their entities in order
    pub async fn fetch_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while self.cursor.has_more() {
            let response = self.fetch_next().await?;
            items.extend(response.items);
        }
        Ok(items)
    }

    /// [`fetch_all`](Self::fetch_all) abandoned when `cancel` fires.
    /// Pages already read are discarded; the cursor stays after the last
    /// page that completed.
    pub async fn fetch_all_with_cancel(&mut self, cancel: &CancellationToken) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while self.cursor.has_more() {
            let response = self.fetch_next_with_cancel(cancel).await?;
            items.extend(response.items);
        }
        Ok(items)
    }

    /// Stream the remaining entities one at a time, fetching each page
    /// when the previous one has been consumed. The stream ends after the
    /// last page or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send
    where
        P: 'static,
    {
        stream::try_unfold(self, |mut list| async move {
            if !list.has_more() {
                return Ok(None);
            }
            let page = list.fetch_next().await?;
            let items = page.items.into_iter().map(Ok::<T, ProxyError>);
            Ok::<_, ProxyError>(Some((stream::iter(items), list)))
        })
        .try_flatten()
    }

    async fn request_page(&self) -> Result<RawPage> {
        match &self.cursor.next_link {
            None => {
                tracing::debug!(
                    model = T::model_name(),
                    select = self.options.select(),
                    filter = self.options.filter(),
                    "Listing first page"
                );
                self.source.list(&self.params, &self.options).await
            }
            Some(token) => {
                tracing::debug!(model = T::model_name(), token = %token, "Listing next page");
                self.source.list_next(token).await
            }
        }
    }

    fn advance(&mut self, page: RawPage) -> Result<ListResponse<T>> {
        if let Some(next) = &page.next_link {
            if self.cursor.next_link.as_ref() == Some(next) || self.cursor.consumed.contains(next) {
                return Err(ProxyError::Pagination(format!(
                    "server returned continuation token '{}' twice",
                    next
                )));
            }
        }

        if let Some(consumed) = self.cursor.next_link.take() {
            self.cursor.consumed.insert(consumed);
        }
        self.cursor.started = true;
        self.cursor.next_link = page.next_link.clone();

        let items: Vec<T> = page.items.iter().map(T::from_json).collect();
        tracing::debug!(
            model = T::model_name(),
            count = items.len(),
            has_more = self.cursor.next_link.is_some(),
            "Fetched page"
        );

        Ok(ListResponse {
            items,
            next_link: page.next_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::models::Pool;
    use crate::proxy::source::FnListSource;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves scripted responses and records every call
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<RawPage>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<RawPage>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self, call: String) -> Result<RawPage> {
            self.calls.lock().unwrap().push(call);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected call")
        }
    }

    #[async_trait]
    impl ListSource<String> for ScriptedSource {
        async fn list(&self, params: &String, options: &ProxyOptions) -> Result<RawPage> {
            self.respond(format!("list:{}:{}", params, options.select().unwrap_or("*")))
        }

        async fn list_next(&self, token: &ContinuationToken) -> Result<RawPage> {
            self.respond(format!("next:{}", token))
        }
    }

    fn pools(ids: &[&str]) -> Vec<Value> {
        ids.iter().map(|id| json!({"id": id})).collect()
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<RawPage> {
        Ok(RawPage::new(pools(ids), next.map(ContinuationToken::from)))
    }

    fn ids(items: &[Pool]) -> Vec<&str> {
        items.iter().filter_map(Pool::id).collect()
    }

    fn proxy(source: Arc<ScriptedSource>) -> ListProxy<Pool, String> {
        ListProxy::new(source, "account-1".to_string(), json!({"select": "id,state"}))
    }

    #[tokio::test]
    async fn test_pages_until_exhausted() {
        let source = ScriptedSource::new(vec![
            page(&["a", "b"], Some("t1")),
            page(&["c"], Some("t2")),
            page(&["d"], None),
        ]);
        let mut list = proxy(source.clone());

        let first = list.fetch_next().await.unwrap();
        assert_eq!(ids(&first.items), vec!["a", "b"]);
        assert!(list.has_more());

        assert_eq!(ids(&list.fetch_next().await.unwrap().items), vec!["c"]);
        let last = list.fetch_next().await.unwrap();
        assert_eq!(ids(&last.items), vec!["d"]);
        assert!(last.next_link.is_none());
        assert!(!list.has_more());

        // Exhausted: empty and no further call
        assert!(list.fetch_next().await.unwrap().is_empty());
        assert_eq!(source.calls(), vec!["list:account-1:id,state", "next:t1", "next:t2"]);
        assert_eq!(list.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn test_single_page_listing() {
        let source = ScriptedSource::new(vec![page(&[], None)]);
        let mut list = proxy(source.clone());

        assert!(list.fetch_next().await.unwrap().is_empty());
        assert!(!list.has_more());
        assert!(list.fetch_next().await.unwrap().is_empty());
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_cursor_for_retry() {
        let source = ScriptedSource::new(vec![
            page(&["a"], Some("t1")),
            Err(ProxyError::Transport("connection reset".into())),
            page(&["b"], None),
        ]);
        let mut list = proxy(source.clone());

        list.fetch_next().await.unwrap();
        let err = list.fetch_next().await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport(_)));
        assert!(list.has_more());

        assert_eq!(ids(&list.fetch_next().await.unwrap().items), vec!["b"]);
        assert_eq!(source.calls(), vec!["list:account-1:id,state", "next:t1", "next:t1"]);
    }

    #[tokio::test]
    async fn test_first_page_failure_retries_list() {
        let source = ScriptedSource::new(vec![
            Err(ProxyError::Server(ServerError::new(500, "InternalError", "boom"))),
            page(&["a"], None),
        ]);
        let mut list = proxy(source.clone());

        assert!(list.fetch_next().await.is_err());
        assert_eq!(list.pages_fetched(), 0);
        assert_eq!(ids(&list.fetch_next().await.unwrap().items), vec!["a"]);
        assert_eq!(source.calls(), vec!["list:account-1:id,state", "list:account-1:id,state"]);
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_in_order() {
        let source = ScriptedSource::new(vec![
            page(&["a", "b"], Some("t1")),
            page(&["b", "c"], Some("t2")),
            page(&["d"], None),
        ]);
        let mut list = proxy(source);

        let all = list.fetch_all().await.unwrap();
        // Items are neither reordered nor deduplicated
        assert_eq!(ids(&all), vec!["a", "b", "b", "c", "d"]);
        assert!(list.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_token_is_an_error() {
        let source = ScriptedSource::new(vec![
            page(&["a"], Some("t1")),
            page(&["b"], Some("t2")),
            page(&["c"], Some("t1")),
        ]);
        let mut list = proxy(source);

        let err = list.fetch_all().await.unwrap_err();
        assert!(matches!(err, ProxyError::Pagination(_)));
        // Cursor still points at the last good token
        assert!(list.has_more());
        assert_eq!(list.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn test_set_options_restarts_listing() {
        let source = ScriptedSource::new(vec![page(&["a"], None), page(&["a"], None)]);
        let mut list = proxy(source.clone());

        list.fetch_all().await.unwrap();
        list.set_options(json!({"select": "id"}));
        assert!(list.has_more());
        list.fetch_next().await.unwrap();
        assert_eq!(source.calls(), vec!["list:account-1:id,state", "list:account-1:id"]);
    }

    #[tokio::test]
    async fn test_stream_yields_entities_lazily() {
        let source = ScriptedSource::new(vec![page(&["a", "b"], Some("t1")), page(&["c"], None)]);
        let list = proxy(source.clone());

        let mut stream = Box::pin(list.into_stream());
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(first.id(), Some("a"));
        assert_eq!(source.calls().len(), 1);

        let rest: Vec<Pool> = stream.try_collect().await.unwrap();
        assert_eq!(ids(&rest), vec!["b", "c"]);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_cursor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = FnListSource::new(
            move |_: (), _: ProxyOptions| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok(RawPage::last(vec![json!({"id": "late"})]))
                }
            },
            |_: ContinuationToken| async { Ok(RawPage::default()) },
        );
        let mut list: ListProxy<Pool, ()> = ListProxy::new(Arc::new(source), (), ProxyOptions::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = list.fetch_next_with_cancel(&cancel).await.unwrap_err();
        assert!(matches!(err, ProxyError::Cancelled));
        assert_eq!(list.pages_fetched(), 0);

        let response = list.fetch_next_with_cancel(&CancellationToken::new()).await.unwrap();
        assert_eq!(ids(&response.items), vec!["late"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_with_cancel() {
        let source = ScriptedSource::new(vec![page(&["a"], Some("t1")), page(&["b"], None)]);
        let mut list = proxy(source.clone());
        let all = list.fetch_all_with_cancel(&CancellationToken::new()).await.unwrap();
        assert_eq!(ids(&all), vec!["a", "b"]);

        let source = ScriptedSource::new(vec![page(&["a"], Some("t1"))]);
        let mut list = proxy(source.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = list.fetch_all_with_cancel(&cancel).await.unwrap_err();
        assert!(matches!(err, ProxyError::Cancelled));
        assert!(source.calls().is_empty());
        assert_eq!(list.pages_fetched(), 0);
    }
}
