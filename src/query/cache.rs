use std::time::{Duration, Instant};

/// A snapshot of one cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: Instant,
    pub is_stale: bool,
}

impl<T> CacheEntry<T> {
    /// Creates a fresh entry fetched now.
    pub fn new(data: T) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            is_stale: false,
        }
    }

    /// Marks the entry stale if it is older than `stale_time`, and reports staleness.
    pub fn check_staleness(&mut self, stale_time: Option<Duration>) -> bool {
        if let Some(stale_time) = stale_time
            && self.fetched_at.elapsed() > stale_time
        {
            self.is_stale = true;
        }
        self.is_stale
    }

    /// Whether the entry has outlived `cache_time`.
    pub fn should_gc(&self, cache_time: Duration) -> bool {
        self.fetched_at.elapsed() > cache_time
    }
}
