//! Bounded, TTL-expiring IP-enrichment cache (§4.3). Built on the same `lru`
//! crate dependency the teacher uses for its DNS answer cache, at a tenth
//! the complexity: no bloom filter, no adaptive eviction thresholds, just
//! size-based LRU plus a per-entry TTL.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use netenrich_domain::IpEnriched;

struct Entry {
    value: IpEnriched,
    inserted_at: Instant,
}

/// Thread-safe bounded `IP string -> IPEnriched` mapping. The mutex is only
/// ever held across the synchronous lru operations, never across an
/// `.await` point.
pub struct IpEnrichmentCache {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl IpEnrichmentCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Returns the cached value iff present and not yet expired.
    pub fn get(&self, ip: &str) -> Option<IpEnriched> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        match guard.get(ip) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                guard.pop(ip);
                None
            }
            None => None,
        }
    }

    /// Inserts or overwrites (last-write-wins), possibly evicting the
    /// least-recently-used entry.
    pub fn insert(&self, ip: String, value: IpEnriched) {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.put(
            ip,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
