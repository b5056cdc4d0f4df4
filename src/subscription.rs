//! Long-lived event sources.
//!
//! A [`Subscription`] wraps a [`SubscriptionSource`], something that can produce a
//! stream of values for as long as the application asks for it. Every time the
//! application's state changes the runtime calls
//! [`Application::subscriptions`](crate::application::Application::subscriptions)
//! and hands the result to the [`SubscriptionManager`], which diffs it against what
//! is already running by [`SubscriptionId`]:
//!
//! - sources that are new get spawned,
//! - sources that disappeared get cancelled,
//! - sources that are still present keep running untouched.
//!
//! Identity is the source's type plus a hash of its parameters, so two user list
//! queries for the same page are the same subscription while the queries for page
//! 1 and page 2 are different ones.

pub mod terminal;
pub mod time;

use std::any::TypeId;
use std::collections::HashMap;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identity of a running subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    type_id: TypeId,
    hash: u64,
}

impl SubscriptionId {
    /// Builds an id from the source type and a hash of its parameters.
    #[must_use]
    pub fn of<T: 'static>(hash: u64) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            hash,
        }
    }
}

/// A source of values that can be turned into a [`Subscription`].
pub trait SubscriptionSource: Send + Sync + 'static {
    /// The type of value the stream yields.
    type Output;

    /// Creates a fresh stream. Called once each time the subscription is started.
    fn stream(&self) -> BoxStream<'static, Self::Output>;

    /// Identity used by the manager to decide whether the subscription is already running.
    fn id(&self) -> SubscriptionId;
}

/// A type-erased, mappable subscription ready to be handed to the runtime.
pub struct Subscription<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: Box<dyn Fn() -> BoxStream<'static, T> + Send + Sync>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Wraps a source.
    pub fn new<S>(source: S) -> Self
    where
        S: SubscriptionSource<Output = T>,
    {
        let id = source.id();
        Self {
            id,
            spawn: Box::new(move || source.stream()),
        }
    }

    /// Transforms every value the subscription produces.
    ///
    /// Mapping does not change identity: the mapped subscription is considered the
    /// same one as the original.
    pub fn map<U, F>(self, f: F) -> Subscription<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + Clone + 'static,
    {
        let spawn = self.spawn;
        Subscription {
            id: self.id,
            spawn: Box::new(move || spawn().map(f.clone()).boxed()),
        }
    }

    /// Returns the subscription's identity.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Handle for a running subscription task.
struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Handle {
    fn cancel(self) {
        self.token.cancel();
        self.join.abort();
    }
}

/// Starts and stops subscriptions as the application's declared set changes.
pub struct SubscriptionManager<Msg> {
    running: HashMap<SubscriptionId, Handle>,
    tx: mpsc::UnboundedSender<Msg>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    /// Creates a manager that forwards every produced value into `tx`.
    pub fn new(tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self {
            running: HashMap::new(),
            tx,
        }
    }

    /// Reconciles the running set against `subscriptions`.
    pub fn update(&mut self, subscriptions: impl IntoIterator<Item = Subscription<Msg>>) {
        let mut wanted = HashMap::new();
        for sub in subscriptions {
            wanted.entry(sub.id).or_insert(sub);
        }

        let stale: Vec<_> = self
            .running
            .keys()
            .filter(|id| !wanted.contains_key(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(handle) = self.running.remove(&id) {
                tracing::trace!(?id, "stopping subscription");
                handle.cancel();
            }
        }

        for (id, sub) in wanted {
            if self.running.contains_key(&id) {
                continue;
            }
            tracing::trace!(?id, "starting subscription");
            let handle = self.spawn(sub);
            self.running.insert(id, handle);
        }
    }

    /// Number of subscriptions currently running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.running.len()
    }

    /// Returns `true` when nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Cancels every running subscription.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.cancel();
        }
    }

    fn spawn(&self, sub: Subscription<Msg>) -> Handle {
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();
        let mut stream = (sub.spawn)();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    next = stream.next() => match next {
                        Some(msg) => {
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Handle { token, join }
    }
}

impl<Msg> Drop for SubscriptionManager<Msg> {
    fn drop(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.cancel();
        }
    }
}
