//! CRL caching with TTL
//!
//! Thread-safe cache of parsed CRLs keyed by distribution point URL, so
//! repeated endpoint validations do not re-fetch the same CRL on every
//! pipeline cycle.

use super::crl::CrlInfo;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedCrl {
    crl_info: CrlInfo,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedCrl {
    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Thread-safe CRL cache with TTL and bounded size
#[derive(Debug)]
pub struct CrlCache {
    entries: DashMap<String, CachedCrl>,
    max_entries: usize,
}

impl CrlCache {
    /// Create a new CRL cache holding at most `max_entries` CRLs
    pub fn new(max_entries: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            max_entries,
        })
    }

    /// Get a CRL from cache by distribution point URL
    ///
    /// Expired entries are removed and reported as a miss.
    pub fn get(&self, url: &str) -> Option<CrlInfo> {
        let hit = self.entries.get(url)?;
        if hit.is_expired() {
            drop(hit);
            self.entries.remove(url);
            return None;
        }
        Some(hit.crl_info.clone())
    }

    /// Insert a CRL into the cache
    ///
    /// When the cache is full, the oldest entry is evicted first.
    pub fn insert(&self, url: String, crl_info: CrlInfo, ttl: Duration) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&url) {
            self.evict_oldest();
        }

        self.entries.insert(
            url,
            CachedCrl {
                crl_info,
                cached_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Remove expired entries from the cache
    pub fn cleanup_expired(&self) {
        self.entries.retain(|_, cached| !cached.is_expired());
    }

    /// Number of cached CRLs (including not-yet-cleaned expired entries)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.cached_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
