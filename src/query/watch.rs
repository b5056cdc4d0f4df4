//! Queries as subscriptions.
//!
//! A [`Query`] keeps one cache key on screen in sync with the server. When it is
//! subscribed:
//!
//! 1. cached data, if any, is emitted straight away,
//! 2. missing or stale data is loaded through [`QueryClient::fetch`], so several
//!    subscribers to the same key still cause a single request,
//! 3. an invalidation covering the key emits the stale value (or `Loading`) and
//!    loads again.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast;

use crate::subscription::{SubscriptionId, SubscriptionSource};

use super::client::{QueryClient, QueryError};
use super::key::QueryKey;

/// What the view should render for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<T> {
    /// Nothing to show yet; a request is on its way.
    Loading,
    /// Data is available.
    Success {
        data: T,
        /// A refetch has been requested and this is the previous value.
        is_stale: bool,
    },
    /// The last request failed. Older data may still be cached as stale; an
    /// invalidation retries the request.
    Error(String),
}

/// A query update delivered to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult<T> {
    pub key: QueryKey,
    pub state: QueryState<T>,
}

impl<T> QueryResult<T> {
    /// Returns the data if the query succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }

    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }
}

type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync>;

/// A subscription that watches one key of a [`QueryClient`].
pub struct Query<V> {
    key: QueryKey,
    fetcher: Fetcher<V>,
    client: Arc<QueryClient>,
}

impl<V> Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a query for `key`, loading with `fetcher` when the cache cannot answer.
    pub fn new<F>(key: QueryKey, fetcher: F, client: Arc<QueryClient>) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(fetcher),
            client,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl<V> SubscriptionSource for Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = QueryResult<V>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        let key = self.key.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let client = Arc::clone(&self.client);

        stream::unfold(State::Initial, move |state| {
            let key = key.clone();
            let fetcher = Arc::clone(&fetcher);
            let client = Arc::clone(&client);

            async move {
                let emit = |state| QueryResult {
                    key: key.clone(),
                    state,
                };

                match state {
                    State::Initial => {
                        // Subscribe before touching the cache so no invalidation is missed.
                        let rx = client.subscribe_invalidation();
                        match client.get::<V>(&key) {
                            Some(cached) if !cached.is_stale => Some((
                                emit(QueryState::Success {
                                    data: cached.data,
                                    is_stale: false,
                                }),
                                State::Watching { rx },
                            )),
                            Some(cached) => Some((
                                emit(QueryState::Success {
                                    data: cached.data,
                                    is_stale: true,
                                }),
                                State::Fetching { rx },
                            )),
                            None => Some((emit(QueryState::Loading), State::Fetching { rx })),
                        }
                    }

                    State::Fetching { rx } => {
                        let result = client.fetch(&key, || fetcher()).await;
                        let state = match result {
                            Ok(data) => QueryState::Success {
                                data,
                                is_stale: client.get::<V>(&key).is_some_and(|e| e.is_stale),
                            },
                            Err(e) => QueryState::Error(e.to_string()),
                        };
                        Some((emit(state), State::Watching { rx }))
                    }

                    State::Watching { mut rx } => loop {
                        match rx.recv().await {
                            Ok(prefix) if key.starts_with(&prefix) => {
                                let state = client.get::<V>(&key).map_or(
                                    QueryState::Loading,
                                    |cached| QueryState::Success {
                                        data: cached.data,
                                        is_stale: true,
                                    },
                                );
                                return Some((emit(state), State::Fetching { rx }));
                            }
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::debug!(%key, skipped, "invalidations lagged, refetching");
                                return Some((emit(QueryState::Loading), State::Fetching { rx }));
                            }
                            Err(broadcast::error::RecvError::Closed) => return None,
                        }
                    },
                }
            }
        })
        .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

impl<V> Hash for Query<V> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.key.hash(hasher);
    }
}

enum State {
    Initial,
    Fetching { rx: broadcast::Receiver<QueryKey> },
    Watching { rx: broadcast::Receiver<QueryKey> },
}
