// Key/value cache store with per-entry TTL, counters, and glob scans
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CacheConfig, StoreStats};
use crate::error::{DocSearchError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Abstract cache store interface.
///
/// Every operation is a single atomic step. Implementations must never hold
/// internal locks across network I/O; callers treat any `Err` as a cache miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live value. Stale entries are removed and reported as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value, resetting its insertion time.
    ///
    /// When the store is at capacity and `key` is new, the single oldest
    /// entry is evicted first. `ttl` overrides the store default.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Copy the live value under `source` to `destination`.
    ///
    /// Capacity eviction for the write never removes `source`. Returns the
    /// copied value, or `None` when `source` is absent or stale.
    async fn copy(
        &self,
        source: &str,
        destination: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<String>>;

    /// Remove a key. Returns `true` if a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether a live entry exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Whole seconds until `key` expires, or `-1` when it is absent or
    /// never expires.
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// Increment the integer stored under `key`, creating it at 0 first.
    ///
    /// Counters never expire, are never evicted for capacity, and do not
    /// count toward `max_entries`. Only `delete` and `clear` remove them.
    async fn incr(&self, key: &str, amount: i64) -> Result<i64>;

    /// Enumerate live keys matching a `*` glob pattern.
    ///
    /// Returns `(next_cursor, keys)`; a `next_cursor` of `0` means the scan
    /// is complete. `count` is a batch-size hint.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// Remove every entry, counters included. Returns the number removed.
    async fn clear(&self) -> Result<usize>;

    /// Number of live cached entries, counters excluded.
    async fn size(&self) -> Result<usize>;

    async fn stats(&self) -> Result<StoreStats>;
}

/// Entry in the in-memory store. `ttl: None` marks a counter.
struct StoredEntry {
    value: String,
    inserted_at: Instant,
    ttl: Option<Duration>,
}

impl StoredEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl: Some(ttl),
        }
    }

    fn counter(value: i64) -> Self {
        Self {
            value: value.to_string(),
            inserted_at: Instant::now(),
            ttl: None,
        }
    }

    fn is_counter(&self) -> bool {
        self.ttl.is_none()
    }

    fn is_live(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.inserted_at) < ttl,
            None => true,
        }
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.ttl
            .map(|ttl| ttl.saturating_sub(now.saturating_duration_since(self.inserted_at)))
    }
}

/// Single-process store shared by all workers of one deployment.
///
/// All bookkeeping happens under one mutex; expiry is evaluated lazily on
/// access and during eviction, never by a background sweep.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl MemoryStore {
    /// Create a new store from cache configuration
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_limits(config.ttl(), config.max_entries)
    }

    pub fn with_limits(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            max_entries,
        }
    }

    /// Remove the cached entry with the oldest insertion time, skipping
    /// `protect` and counters.
    fn evict_oldest(entries: &mut HashMap<String, StoredEntry>, protect: Option<&str>) -> bool {
        let oldest = entries
            .iter()
            .filter(|(key, entry)| !entry.is_counter() && Some(key.as_str()) != protect)
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                debug!("Evicting oldest cache entry: {}", key);
                entries.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Insert under the lock, honoring the capacity bound.
    /// Returns `false` when the write had to be skipped.
    fn insert_locked(
        &self,
        entries: &mut HashMap<String, StoredEntry>,
        key: &str,
        entry: StoredEntry,
        protect: Option<&str>,
    ) -> bool {
        let replaces_cached = entries.get(key).is_some_and(|old| !old.is_counter());
        let at_capacity = self.max_entries > 0
            && !entry.is_counter()
            && !replaces_cached
            && entries.values().filter(|e| !e.is_counter()).count() >= self.max_entries;
        if at_capacity && !Self::evict_oldest(entries, protect) {
            debug!("No evictable entry for {}, skipping write", key);
            return false;
        }
        entries.insert(key.to_string(), entry);
        true
    }

    /// Look up a live entry, dropping it if stale.
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, StoredEntry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a StoredEntry> {
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
            return None;
        }
        entries.get(key)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, Instant::now()).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = StoredEntry::new(value.to_string(), ttl.unwrap_or(self.default_ttl));
        let mut entries = self.entries.lock();
        self.insert_locked(&mut entries, key, entry, None);
        Ok(())
    }

    async fn copy(
        &self,
        source: &str,
        destination: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        let value = match Self::live_entry(&mut entries, source, Instant::now()) {
            Some(entry) => entry.value.clone(),
            None => return Ok(None),
        };

        if source != destination {
            let entry = StoredEntry::new(value.clone(), ttl.unwrap_or(self.default_ttl));
            self.insert_locked(&mut entries, destination, entry, Some(source));
        }
        Ok(Some(value))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        Ok(entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(Instant::now())))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, Instant::now()).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Ok(Self::live_entry(&mut entries, key, now)
            .and_then(|entry| entry.remaining(now))
            .map(|remaining| remaining.as_secs_f64().ceil() as i64)
            .unwrap_or(-1))
    }

    async fn incr(&self, key: &str, amount: i64) -> Result<i64> {
        let mut entries = self.entries.lock();
        let current = match Self::live_entry(&mut entries, key, Instant::now()) {
            Some(entry) => entry.value.parse::<i64>().map_err(|_| {
                DocSearchError::CacheStore(format!("value at {} is not an integer", key))
            })?,
            None => 0,
        };

        let next = current + amount;
        entries.insert(key.to_string(), StoredEntry::counter(next));
        Ok(next)
    }

    async fn scan(&self, cursor: u64, pattern: &str, _count: usize) -> Result<(u64, Vec<String>)> {
        // One call covers the whole keyspace, so any resumed cursor is past the end.
        if cursor != 0 {
            return Ok((0, Vec::new()));
        }

        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));

        let mut matches: Vec<(&String, Instant)> = entries
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, entry)| (key, entry.inserted_at))
            .collect();
        matches.sort_by_key(|(_, inserted_at)| *inserted_at);

        Ok((0, matches.into_iter().map(|(key, _)| key.clone()).collect()))
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        debug!("Cache store cleared ({} entries)", removed);
        Ok(removed)
    }

    async fn size(&self) -> Result<usize> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries.values().filter(|entry| !entry.is_counter()).count())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));

        let approx_memory_bytes = entries
            .iter()
            .map(|(key, entry)| {
                key.len()
                    + entry.value.len()
                    + std::mem::size_of::<String>()
                    + std::mem::size_of::<StoredEntry>()
            })
            .sum();

        Ok(StoreStats {
            entry_count: entries.values().filter(|entry| !entry.is_counter()).count(),
            approx_memory_bytes,
            ttl_seconds: self.default_ttl.as_secs(),
            max_entries: self.max_entries,
        })
    }
}

/// Match `text` against a glob where `*` matches any run of characters.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
