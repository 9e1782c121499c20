//! Sharded TTL + LRU cache for ranked search responses.
//!
//! Keys are a normalized composite of query, index, and the options that
//! affect the response; never volatile fields. Entries are replaced, not
//! mutated, on refresh, and are never served past their expiry. Reads take
//! only a shard read lock (recency is an atomic counter inside the entry);
//! eviction runs on write pressure.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::proxy::QueryInfo;
use crate::ranking::RankedResult;

/// Number of lock shards.
const SHARD_COUNT: usize = 16;

/// Cache key: everything that determines the response, nothing volatile.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    index: String,
    limit: usize,
    offset: usize,
    with_token_info: bool,
}

impl CacheKey {
    /// Build a key with a normalized query (trimmed, lowercased,
    /// whitespace-collapsed).
    pub fn new(
        query: &str,
        index: &str,
        limit: usize,
        offset: usize,
        with_token_info: bool,
    ) -> Self {
        let normalized = query
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        CacheKey {
            query: normalized,
            index: index.to_string(),
            limit,
            offset,
            with_token_info,
        }
    }
}

/// A cached, fully ranked response.
#[derive(Clone, Debug)]
pub struct CachedSearch {
    /// Ranked results as they were returned.
    pub results: Vec<RankedResult>,

    /// Distinct-document count before pagination.
    pub total_hits: u64,

    /// The diagnostic block computed for the original response.
    pub query_info: Option<QueryInfo>,
}

struct CacheEntry {
    value: Arc<CachedSearch>,
    expires_at: Instant,
    inserted: u64,
    last_used: AtomicU64,
}

/// Cache hit/miss counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    /// Number of successful gets.
    pub hits: u64,

    /// Number of gets that found nothing usable.
    pub misses: u64,
}

/// The response cache.
pub struct ResponseCache {
    shards: Vec<RwLock<AHashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
    capacity_per_shard: usize,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache with the given TTL and total capacity.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity_per_shard = capacity.div_ceil(SHARD_COUNT).max(1);
        ResponseCache {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(AHashMap::new())).collect(),
            ttl,
            capacity_per_shard,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn shard_for(&self, key: &CacheKey) -> &RwLock<AHashMap<CacheKey, CacheEntry>> {
        use std::hash::{Hash, Hasher};
        let mut hasher = ahash::AHasher::default();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Look up a key. Expired entries count as misses and are removed.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedSearch>> {
        let shard = self.shard_for(key);
        let now = Instant::now();

        {
            let guard = shard.read();
            if let Some(entry) = guard.get(key) {
                if entry.expires_at > now {
                    entry
                        .last_used
                        .store(self.tick.fetch_add(1, Ordering::Relaxed), Ordering::Relaxed);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&entry.value));
                }
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Expired: drop it so the shard does not fill with dead entries.
        let mut guard = shard.write();
        if let Some(entry) = guard.get(key) {
            if entry.expires_at <= now {
                guard.remove(key);
            } else {
                // A writer refreshed it between our two lock takes.
                entry
                    .last_used
                    .store(self.tick.fetch_add(1, Ordering::Relaxed), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.value));
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace a value under the configured TTL.
    pub fn put(&self, key: CacheKey, value: CachedSearch) {
        let now = Instant::now();
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let shard = self.shard_for(&key);
        let mut guard = shard.write();

        if guard.len() >= self.capacity_per_shard && !guard.contains_key(&key) {
            Self::evict(&mut guard, now, self.capacity_per_shard);
        }

        guard.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                expires_at: now + self.ttl,
                inserted: tick,
                last_used: AtomicU64::new(tick),
            },
        );
    }

    /// Drop expired entries, then the least recently used (ties by
    /// insertion order) until the shard is under capacity.
    fn evict(guard: &mut AHashMap<CacheKey, CacheEntry>, now: Instant, capacity: usize) {
        guard.retain(|_, entry| entry.expires_at > now);

        while guard.len() >= capacity {
            let victim = guard
                .iter()
                .min_by_key(|(_, entry)| {
                    (entry.last_used.load(Ordering::Relaxed), entry.inserted)
                })
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    guard.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of live entries across all shards (expired included until
    /// reaped).
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
