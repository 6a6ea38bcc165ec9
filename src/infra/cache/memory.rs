//! In-process cache used when no Redis endpoint is configured.
//!
//! Entries carry an absolute expiry and are evicted lazily on read, or by LRU
//! pressure once the capacity bound is reached.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;
use tracing::warn;

use crate::application::cache::{BannerCache, BannerKey, CacheError};
use crate::domain::entities::BannerContent;

const TARGET: &str = "vitrine::cache::memory";

struct Entry {
    payload: String,
    expires_at: Instant,
}

pub struct MemoryBannerCache {
    entries: Mutex<LruCache<BannerKey, Entry>>,
}

impl MemoryBannerCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Store an already-encoded payload as-is.
    pub fn put_raw(&self, key: BannerKey, payload: impl Into<String>, ttl: Duration) {
        let mut entries = self.guard("put_raw");
        entries.put(
            key,
            Entry {
                payload: payload.into(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.guard("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A panic while the lock was held leaves at worst a stale entry, which
    /// expires like any other.
    fn guard(&self, op: &'static str) -> MutexGuard<'_, LruCache<BannerKey, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!(target = TARGET, op, "recovered poisoned banner cache lock");
            poisoned.into_inner()
        })
    }

    fn lookup(&self, key: BannerKey) -> Option<String> {
        let mut entries = self.guard("get");
        let expired = match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.payload.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(&key);
        }
        None
    }
}

#[async_trait]
impl BannerCache for MemoryBannerCache {
    async fn get(&self, key: BannerKey) -> Result<Option<BannerContent>, CacheError> {
        match self.lookup(key) {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(CacheError::codec),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: BannerKey,
        content: &BannerContent,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(content).map_err(CacheError::codec)?;
        self.put_raw(key, payload, ttl);
        Ok(())
    }
}
