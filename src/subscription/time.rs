//! Periodic ticks.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::wrappers::IntervalStream;

use super::{SubscriptionId, SubscriptionSource};

/// Emits `()` every `period`. The first tick comes one period after start, and
/// ticks missed while the runtime was busy are dropped rather than replayed.
///
/// The dashboard uses it to sweep expired cache entries:
///
/// ```
/// use std::time::Duration;
/// use roster::subscription::{Subscription, time::Timer};
///
/// enum Message {
///     SweepCache,
/// }
///
/// let sub = Subscription::new(Timer::new(Duration::from_secs(60))).map(|()| Message::SweepCache);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timer {
    period: Duration,
}

impl Timer {
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl SubscriptionSource for Timer {
    type Output = ();

    fn stream(&self) -> BoxStream<'static, ()> {
        let mut ticks = interval(self.period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        IntervalStream::new(ticks).skip(1).map(|_| ()).boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}
