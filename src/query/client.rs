use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::api::ApiError;
use crate::command::Command;

use super::cache::CacheEntry;
use super::config::QueryConfig;
use super::key::QueryKey;

/// Error type for query and mutation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Fetch failed: {0}")]
    FetchError(String),
}

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, QueryError>>>;

/// Untyped bookkeeping for one key. The value and the in-flight load are stored
/// type-erased so staleness can be flipped without knowing `T`.
#[derive(Default)]
struct Slot {
    data: Option<Box<dyn Any + Send + Sync>>,
    fetched_at: Option<Instant>,
    stale: bool,
    generation: u64,
    /// The last load for this key failed; an invalidation should retry it.
    failed: bool,
    inflight: Option<Box<dyn Any + Send + Sync>>,
}

impl Slot {
    fn entry<T: Clone + 'static>(&self) -> Option<CacheEntry<T>> {
        let data = self.data.as_ref()?.downcast_ref::<T>()?.clone();
        Some(CacheEntry {
            data,
            fetched_at: self.fetched_at?,
            is_stale: self.stale,
        })
    }
}

/// Session-scoped cache of server data.
///
/// The client owns every cached value. Reads go through [`fetch`](Self::fetch),
/// which serves fresh data from memory and otherwise runs the supplied loader;
/// writes elsewhere in the system call [`invalidate`](Self::invalidate) so the
/// next read goes back to the server. While a load for a key is running, every
/// other `fetch` for that key waits on the same load instead of issuing its own.
///
/// The client is cheap to clone and is normally shared as an `Arc` between the
/// queries and mutations that need it.
///
/// # Example
///
/// ```
/// use roster::query::{QueryClient, QueryConfig, QueryError, QueryKey};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = QueryClient::with_config(QueryConfig::default());
/// let key = QueryKey::new("answer");
///
/// let value = client
///     .fetch(&key, || async { Ok::<_, QueryError>(42) })
///     .await;
/// assert_eq!(value, Ok(42));
/// assert_eq!(client.get::<i32>(&key).map(|e| e.data), Some(42));
/// # }
/// ```
#[derive(Clone)]
pub struct QueryClient {
    slots: Arc<DashMap<QueryKey, Slot>>,
    invalidation_tx: broadcast::Sender<QueryKey>,
    config: QueryConfig,
}

impl QueryClient {
    /// Creates a client with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    /// Creates a client with the given configuration.
    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (invalidation_tx, _) = broadcast::channel(100);
        Self {
            slots: Arc::new(DashMap::new()),
            invalidation_tx,
            config,
        }
    }

    /// Returns the cached entry for `key`, fresh or stale.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<CacheEntry<T>> {
        let mut entry = self.slots.get(key)?.entry::<T>()?;
        entry.check_staleness(self.config.stale_time);
        Some(entry)
    }

    /// Returns the value for `key`, loading it with `loader` unless a fresh copy is
    /// cached.
    ///
    /// If a load for `key` is already running, this waits for that load instead of
    /// calling `loader`. A failed load caches nothing: the error goes to every
    /// waiter and whatever was cached before stays as it was. The load runs on its
    /// own tokio task, so dropping this future does not abandon it.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, loader: F) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
    {
        let load = {
            let mut slot = self.slots.entry(key.clone()).or_default();

            if let Some(mut entry) = slot.entry::<T>()
                && !entry.check_staleness(self.config.stale_time)
            {
                tracing::debug!(%key, "cache hit");
                return Ok(entry.data);
            }

            if let Some(pending) = slot
                .inflight
                .as_ref()
                .and_then(|pending| pending.downcast_ref::<SharedLoad<T>>())
            {
                tracing::debug!(%key, "joining in-flight load");
                pending.clone()
            } else {
                tracing::debug!(%key, stale = slot.data.is_some(), "cache miss, loading");
                let load = self.spawn_load(key.clone(), slot.generation, loader());
                slot.inflight = Some(Box::new(load.clone()));
                load
            }
        };

        load.await
    }

    /// Runs a load on its own task so it finishes and is stored even when every
    /// caller waiting on it goes away.
    fn spawn_load<T, Fut>(&self, key: QueryKey, generation: u64, load: Fut) -> SharedLoad<T>
    where
        T: Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        let task = tokio::spawn(self.track(key.clone(), generation, load));

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(%key, error = %e, "load task died");
                if let Some(mut slot) = slots.get_mut(&key) {
                    slot.inflight = None;
                }
                Err(QueryError::FetchError(e.to_string()))
            })
        }
        .boxed()
        .shared()
    }

    /// Wraps a load so that its outcome is written back to the slot exactly once,
    /// however many callers are waiting on it.
    fn track<T, Fut>(
        &self,
        key: QueryKey,
        generation: u64,
        load: Fut,
    ) -> impl Future<Output = Result<T, QueryError>> + Send + 'static
    where
        T: Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        async move {
            let result = load.await;
            let mut slot = slots.entry(key.clone()).or_default();
            slot.inflight = None;
            match &result {
                Ok(data) => {
                    slot.data = Some(Box::new(data.clone()));
                    slot.fetched_at = Some(Instant::now());
                    // Invalidated while loading: keep the data but refetch next time.
                    slot.stale = slot.generation != generation;
                    slot.failed = false;
                    tracing::debug!(%key, stale = slot.stale, "stored");
                }
                Err(e) => {
                    slot.failed = true;
                    tracing::warn!(%key, error = %e, "load failed, cache left as is");
                }
            }
            result
        }
    }

    /// Marks every entry under `prefix` as stale and notifies active queries.
    ///
    /// Loads that are running for matching keys will have their result stored as
    /// stale. Keys whose last load failed are announced again so their watchers
    /// retry. Entries that are already stale are otherwise left alone, so repeating
    /// an invalidation does nothing. Returns how many entries went from fresh to
    /// stale.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut invalidated = 0;
        let mut touched = false;

        for mut slot in self.slots.iter_mut() {
            if !slot.key().starts_with(prefix) {
                continue;
            }
            if slot.data.is_some() && !slot.stale {
                slot.stale = true;
                slot.generation += 1;
                invalidated += 1;
                touched = true;
            } else if slot.inflight.is_some() {
                slot.generation += 1;
                touched = true;
            } else if slot.failed {
                touched = true;
            }
        }

        tracing::info!(%prefix, invalidated, "invalidate");
        if touched {
            // No receivers just means no query is on screen.
            let _ = self.invalidation_tx.send(prefix.clone());
        }
        invalidated
    }

    /// [`invalidate`](Self::invalidate) as a command that produces no message.
    pub fn invalidate_command<Msg: Send + 'static>(&self, prefix: &QueryKey) -> Command<Msg> {
        let client = self.clone();
        let prefix = prefix.clone();
        Command::effect_future(async move {
            client.invalidate(&prefix);
        })
    }

    /// Drops entries older than the configured cache time. Keys with a load in
    /// flight are kept. Returns how many entries were removed.
    pub fn gc(&self) -> usize {
        let cache_time = self.config.cache_time;
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            slot.inflight.is_some()
                || slot
                    .fetched_at
                    .is_some_and(|at| at.elapsed() <= cache_time)
        });
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            tracing::debug!(removed, "gc");
        }
        removed
    }

    /// Number of keys the cache is tracking.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when nothing is cached or loading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Receives the prefix of every effective invalidation.
    pub(crate) fn subscribe_invalidation(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidation_tx.subscribe()
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.slots.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: i32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<i32, QueryError>> {
        let calls = Arc::clone(calls);
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            })
        }
    }

    fn failing_loader() -> BoxFuture<'static, Result<i32, QueryError>> {
        Box::pin(async { Err(QueryError::FetchError("boom".to_string())) })
    }

    #[test]
    fn test_query_client_new() {
        let client = QueryClient::new();
        assert!(client.is_empty());
        assert_eq!(client.config().stale_time, None);
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::FetchError("test error".to_string());
        assert_eq!(err.to_string(), "Fetch failed: test error");

        let err = QueryError::from(ApiError::Network("refused".to_string()));
        assert_eq!(err.to_string(), "Network error: refused");
    }

    #[tokio::test]
    async fn test_fetch_caches_value() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("n");

        assert_eq!(client.fetch(&key, counting_loader(&calls, 1)).await, Ok(1));
        assert_eq!(client.fetch(&key, counting_loader(&calls, 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let entry = client.get::<i32>(&key).unwrap();
        assert_eq!(entry.data, 1);
        assert!(!entry.is_stale);
    }

    #[tokio::test]
    async fn test_get_absent() {
        let client = QueryClient::new();
        assert!(client.get::<i32>(&QueryKey::new("missing")).is_none());
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_is_absent() {
        let client = QueryClient::new();
        let key = QueryKey::new("n");
        client.fetch(&key, || async { Ok(7_i32) }).await.unwrap();
        assert!(client.get::<String>(&key).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_load() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("slow");

        let slow = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, QueryError>(5)
            }
        };

        let (a, b, c) = tokio::join!(
            client.fetch(&key, slow(Arc::clone(&calls))),
            client.fetch(&key, slow(Arc::clone(&calls))),
            client.fetch(&key, slow(Arc::clone(&calls))),
        );

        assert_eq!((a, b, c), (Ok(5), Ok(5), Ok(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let client = QueryClient::new();
        let key = QueryKey::new("n");

        let result = client.fetch(&key, failing_loader).await;
        assert_eq!(result, Err(QueryError::FetchError("boom".to_string())));
        assert!(client.get::<i32>(&key).is_none());

        // The next fetch tries again.
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(client.fetch(&key, counting_loader(&calls, 3)).await, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_stale_entry() {
        let client = QueryClient::new();
        let key = QueryKey::new("n");
        client.fetch(&key, || async { Ok(1_i32) }).await.unwrap();
        client.invalidate(&key);

        assert!(client.fetch(&key, failing_loader).await.is_err());

        let entry = client.get::<i32>(&key).unwrap();
        assert_eq!(entry.data, 1);
        assert!(entry.is_stale);
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let users_1 = QueryKey::new("users").with(1);
        let users_2 = QueryKey::new("users").with(2);
        let other = QueryKey::new("settings");

        client.fetch(&users_1, counting_loader(&calls, 1)).await.unwrap();
        client.fetch(&users_2, counting_loader(&calls, 2)).await.unwrap();
        client.fetch(&other, counting_loader(&calls, 3)).await.unwrap();

        assert_eq!(client.invalidate(&QueryKey::new("users")), 2);
        assert!(client.get::<i32>(&users_1).unwrap().is_stale);
        assert!(client.get::<i32>(&users_2).unwrap().is_stale);
        assert!(!client.get::<i32>(&other).unwrap().is_stale);

        assert_eq!(client.fetch(&users_1, counting_loader(&calls, 10)).await, Ok(10));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(!client.get::<i32>(&users_1).unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let client = QueryClient::new();
        let key = QueryKey::new("users").with(1);
        client.fetch(&key, || async { Ok(1_i32) }).await.unwrap();

        let mut rx = client.subscribe_invalidation();
        assert_eq!(client.invalidate(&QueryKey::new("users")), 1);
        assert_eq!(client.invalidate(&QueryKey::new("users")), 0);

        assert_eq!(rx.try_recv().ok(), Some(QueryKey::new("users")));
        assert!(rx.try_recv().is_err(), "second invalidation must not notify");
    }

    #[tokio::test]
    async fn test_invalidate_during_load_stores_stale() {
        let client = QueryClient::new();
        let key = QueryKey::new("n");
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let pending = {
            let client = client.clone();
            let key = key.clone();
            tokio::spawn(async move {
                client
                    .fetch(&key, move || async move {
                        let _ = release_rx.await;
                        Ok::<_, QueryError>(1_i32)
                    })
                    .await
            })
        };

        // Let the spawned fetch register its load.
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.invalidate(&key);
        let _ = release_tx.send(());

        assert_eq!(pending.await.unwrap(), Ok(1));
        assert!(client.get::<i32>(&key).unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_stale_time_ages_entries() {
        let client = QueryClient::with_config(QueryConfig::new(
            Some(Duration::from_millis(5)),
            Duration::from_secs(60),
        ));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("n");

        client.fetch(&key, counting_loader(&calls, 1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(client.get::<i32>(&key).unwrap().is_stale);

        client.fetch(&key, counting_loader(&calls, 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gc_removes_expired_entries() {
        let client =
            QueryClient::with_config(QueryConfig::new(None, Duration::from_millis(5)));
        client.fetch(&QueryKey::new("a"), || async { Ok(1_i32) }).await.unwrap();
        assert_eq!(client.gc(), 0);

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(client.gc(), 1);
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn test_gc_drops_failed_placeholders() {
        let client = QueryClient::new();
        let _ = client.fetch(&QueryKey::new("a"), failing_loader).await;
        assert_eq!(client.len(), 1);
        assert_eq!(client.gc(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_announces_failed_keys() {
        let client = QueryClient::new();
        let key = QueryKey::new("users").with(1);
        let _ = client.fetch(&key, failing_loader).await;

        let mut rx = client.subscribe_invalidation();
        assert_eq!(client.invalidate(&QueryKey::new("users")), 0);
        assert_eq!(rx.try_recv().ok(), Some(QueryKey::new("users")));

        // Once the key loads again there is nothing left to retry.
        client.fetch(&key, || async { Ok(1_i32) }).await.unwrap();
        assert_eq!(client.invalidate(&QueryKey::new("users")), 1);
        assert_eq!(client.invalidate(&QueryKey::new("users")), 0);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_refetch_is_announced_again() {
        let client = QueryClient::new();
        let key = QueryKey::new("n");
        client.fetch(&key, || async { Ok(1_i32) }).await.unwrap();
        client.invalidate(&key);
        let _ = client.fetch(&key, failing_loader).await;

        let mut rx = client.subscribe_invalidation();
        client.invalidate(&key);
        assert_eq!(rx.try_recv().ok(), Some(key));
    }

    #[tokio::test]
    async fn test_abandoned_load_still_completes() {
        let client = QueryClient::with_config(QueryConfig::new(None, Duration::ZERO));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("slow");

        let loader = {
            let calls = Arc::clone(&calls);
            move || async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, QueryError>(9_i32)
            }
        };
        let waited = tokio::time::timeout(Duration::from_millis(10), client.fetch(&key, loader)).await;
        assert!(waited.is_err(), "caller gave up before the load finished");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.get::<i32>(&key).map(|e| e.data), Some(9));

        // Nothing is in flight any more, so the expired entry can be collected.
        assert_eq!(client.gc(), 1);
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_command_produces_no_messages() {
        use futures::StreamExt;

        let client = QueryClient::new();
        let key = QueryKey::new("users").with(1);
        client.fetch(&key, || async { Ok(1_i32) }).await.unwrap();

        let cmd: Command<()> = client.invalidate_command(&QueryKey::new("users"));
        let actions: Vec<_> = cmd.stream.expect("command should run").collect().await;

        assert!(actions.is_empty());
        assert!(client.get::<i32>(&key).unwrap().is_stale);
    }
}
