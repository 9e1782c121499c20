//! Bounded TTL response cache.

pub mod response_cache;

pub use response_cache::{CacheKey, CacheStats, CachedSearch, ResponseCache};
