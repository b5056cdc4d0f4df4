use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;

use crossterm::event::{Event, EventStream};
use futures::{StreamExt, stream::BoxStream};

use super::{SubscriptionId, SubscriptionSource};

/// Terminal input events (keys, resizes, paste) using crossterm's `EventStream`.
///
/// Read errors are forwarded rather than swallowed; the stream ends after the first
/// one since crossterm cannot recover the reader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminalEvents;

impl TerminalEvents {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SubscriptionSource for TerminalEvents {
    type Output = io::Result<Event>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        let events = EventStream::new();

        futures::stream::unfold(Some(events), |state| async move {
            let mut events = state?;
            match events.next().await {
                Some(Ok(event)) => Some((Ok(event), Some(events))),
                Some(Err(e)) => Some((Err(e), None)),
                None => None,
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

impl Hash for TerminalEvents {
    fn hash<H: Hasher>(&self, state: &mut H) {
        "terminal".hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events_id_consistency() {
        assert_eq!(TerminalEvents::new().id(), TerminalEvents::new().id());
    }

    #[test]
    fn test_terminal_events_hash_not_empty() {
        #[derive(Hash)]
        struct Empty;

        let mut hasher1 = DefaultHasher::new();
        TerminalEvents::new().hash(&mut hasher1);

        let mut hasher2 = DefaultHasher::new();
        Empty.hash(&mut hasher2);

        assert_ne!(hasher1.finish(), hasher2.finish());
    }
}
