use std::time::Duration;

/// Configuration for cache behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long fetched data stays fresh.
    ///
    /// `None` means data only goes stale when it is invalidated. With `Some(d)`,
    /// entries also go stale `d` after they were fetched.
    pub stale_time: Option<Duration>,

    /// How long an entry is retained after it was fetched before
    /// [`QueryClient::gc`](super::QueryClient::gc) may drop it.
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: None,
            cache_time: Duration::from_secs(5 * 60),
        }
    }
}

impl QueryConfig {
    /// Creates a configuration with the given stale and cache times.
    #[must_use]
    pub const fn new(stale_time: Option<Duration>, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }
}
