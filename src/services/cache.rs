use crate::types::AnalysisResult;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// A cached value with the instant it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub inserted_at: Instant,
}

/// A thread-safe cache with TTL support.
///
/// An entry is fresh while its age is strictly below the TTL. Stale entries
/// are never returned but stay in the map until [`Cache::evict_expired`].
pub struct Cache<V> {
    data: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// Cache of completed analyses keyed by canonical symbol.
pub type AnalysisCache = Cache<Arc<AnalysisResult>>;

impl<V: Clone> Cache<V> {
    /// Create a new cache with the given TTL on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            data: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.data.get(key)?;
        if self.is_fresh(entry.value(), self.clock.now()) {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: self.clock.now(),
        };
        self.data.insert(key, entry);
    }

    /// Age of `entry` according to the cache clock.
    pub fn age_of(&self, entry: &CacheEntry<V>) -> Duration {
        self.clock.now().saturating_duration_since(entry.inserted_at)
    }

    /// All entries that are still fresh.
    pub fn fresh_entries(&self) -> Vec<CacheEntry<V>> {
        let now = self.clock.now();
        self.data
            .iter()
            .filter(|entry| self.is_fresh(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Remove entries older than the TTL at `now`. Returns how many were removed.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.data.retain(|_, entry| {
            let expired = now.saturating_duration_since(entry.inserted_at) > self.ttl;
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    /// [`Cache::evict_expired`] at the current clock instant.
    pub fn sweep(&self) -> usize {
        self.evict_expired(self.clock.now())
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        self.data.retain(|_, _| {
            removed += 1;
            false
        });
        removed
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }
}
