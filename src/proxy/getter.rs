//! Single-entity retrieval

use super::options::ProxyOptions;
use super::source::GetSource;
use crate::error::{ProxyError, Result};
use crate::record::Model;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fetch one entity by params
#[async_trait]
pub trait EntityGetter<T, P>: Send + Sync
where
    T: Model,
    P: Send + Sync,
{
    /// Fetch with explicit options such as a `select` projection
    async fn fetch_with_options(&self, params: &P, options: &ProxyOptions) -> Result<T>;

    /// Fetch with default options
    async fn fetch(&self, params: &P) -> Result<T> {
        self.fetch_with_options(params, &ProxyOptions::default()).await
    }

    /// Fetch that gives up with [`ProxyError::Cancelled`] once `cancel` fires
    async fn fetch_with_cancel(
        &self,
        params: &P,
        options: &ProxyOptions,
        cancel: &CancellationToken,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(model = T::model_name(), "Entity fetch cancelled");
                Err(ProxyError::Cancelled)
            }
            entity = self.fetch_with_options(params, options) => entity,
        }
    }
}

/// [`EntityGetter`] that makes one call to its source and normalizes the
/// result. Errors are returned as the source reported them.
pub struct BasicEntityGetter<T, P> {
    supply: Arc<dyn GetSource<P>>,
    _model: PhantomData<fn() -> T>,
}

impl<T, P> BasicEntityGetter<T, P>
where
    T: Model,
    P: Send + Sync,
{
    /// Wrap a data-supply function
    pub fn new(supply: Arc<dyn GetSource<P>>) -> Self {
        Self {
            supply,
            _model: PhantomData,
        }
    }
}

impl<T, P> Clone for BasicEntityGetter<T, P> {
    fn clone(&self) -> Self {
        Self {
            supply: Arc::clone(&self.supply),
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<T, P> EntityGetter<T, P> for BasicEntityGetter<T, P>
where
    T: Model,
    P: Send + Sync,
{
    async fn fetch_with_options(&self, params: &P, options: &ProxyOptions) -> Result<T> {
        tracing::debug!(model = T::model_name(), select = options.select(), "Fetching entity");

        let raw = self.supply.get(params, options).await.map_err(|e| {
            tracing::debug!(model = T::model_name(), error = %e, "Entity fetch failed");
            e
        })?;

        Ok(T::from_json(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::models::{Pool, StorageAccount};
    use crate::proxy::source::FnGetSource;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool_getter(calls: Arc<AtomicUsize>) -> BasicEntityGetter<Pool, String> {
        let source = FnGetSource::new(move |id: String, options: ProxyOptions| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                match id.as_str() {
                    "pool-1" if options.select() == Some("id") => Ok(json!({"id": "pool-1"})),
                    "pool-1" => Ok(json!({"id": "pool-1", "state": "deleting", "vmSize": "standard_d2"})),
                    _ => Err(ProxyError::Server(ServerError::new(
                        404,
                        "PoolNotFound",
                        "The specified pool does not exist.",
                    ))),
                }
            }
        });
        BasicEntityGetter::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_fetch_normalizes_entity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let getter = pool_getter(calls.clone());

        let pool = getter.fetch(&"pool-1".to_string()).await.unwrap();
        assert_eq!(pool.id(), Some("pool-1"));
        assert_eq!(pool.state(), Some("deleting"));
        assert_eq!(pool.vm_size(), Some("standard_d2"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_with_select_fills_defaults() {
        let getter = pool_getter(Arc::new(AtomicUsize::new(0)));
        let options = ProxyOptions::from(json!({"select": "id"}));

        let pool = getter.fetch_with_options(&"pool-1".to_string(), &options).await.unwrap();
        assert_eq!(pool.id(), Some("pool-1"));
        assert_eq!(pool.state(), Some("active"));
        assert_eq!(pool.vm_size(), None);
    }

    #[tokio::test]
    async fn test_not_found_passes_through_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let getter = pool_getter(calls.clone());

        let err = getter.fetch(&"missing".to_string()).await.unwrap_err();
        assert!(err.is_not_found());
        match err {
            ProxyError::Server(server) => assert_eq!(server.code.as_deref(), Some("PoolNotFound")),
            other => panic!("unexpected {:?}", other),
        }
        // No retry on failure
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_with_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let getter = pool_getter(calls.clone());
        let options = ProxyOptions::default();

        let pool = getter
            .fetch_with_cancel(&"pool-1".to_string(), &options, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool.id(), Some("pool-1"));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = getter
            .fetch_with_cancel(&"pool-1".to_string(), &options, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_arm_ids_compare_case_insensitively() {
        let source = FnGetSource::new(|id: String, _: ProxyOptions| async move {
            Ok::<_, ProxyError>(json!({"id": id.to_uppercase(), "name": "store"}))
        });
        let getter: BasicEntityGetter<StorageAccount, String> = BasicEntityGetter::new(Arc::new(source));

        let id = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/store";
        let upper = getter.fetch(&id.to_string()).await.unwrap();
        let lower = StorageAccount::from_json(&json!({"id": id.to_lowercase(), "name": "store"}));
        assert_eq!(upper, lower);
    }
}
