//! L1: a bounded in-memory map with hand-rolled eviction bookkeeping.
//!
//! No third-party cache crate backs this tier; see DESIGN.md for why:
//! the spec's eviction tie-break rules (§4.8, testable property 7) need
//! to be directly inspectable, which an opaque cache like `moka`/`lru`/
//! `dashmap` doesn't offer.

use crate::config::EvictionStrategy;
use crate::entry::CacheEntry;
use crate::error::Result;
use crate::store::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

struct VolatileSlot {
    entry: Arc<CacheEntry>,
    size: u64,
    last_access: OffsetDateTime,
    access_count: u64,
    insertion_seq: u64,
}

struct VolatileInner {
    map: HashMap<String, VolatileSlot>,
    current_bytes: u64,
    next_seq: u64,
}

/// The volatile (L1) tier.
pub struct VolatileStore {
    inner: Mutex<VolatileInner>,
    max_bytes: u64,
    max_entries: u64,
    strategy: EvictionStrategy,
}

impl VolatileStore {
    /// Construct an empty store bounded by `max_bytes` and `max_entries`,
    /// evicting under `strategy` once either bound is hit.
    pub fn new(max_bytes: u64, max_entries: u64, strategy: EvictionStrategy) -> Self {
        Self {
            inner: Mutex::new(VolatileInner {
                map: HashMap::new(),
                current_bytes: 0,
                next_seq: 0,
            }),
            max_bytes,
            max_entries,
            strategy,
        }
    }

    fn select_victim(&self, inner: &VolatileInner) -> Option<String> {
        match self.strategy {
            EvictionStrategy::Lru | EvictionStrategy::Ttl => inner
                .map
                .iter()
                .min_by_key(|(_, slot)| (slot.last_access, slot.insertion_seq))
                .map(|(k, _)| k.clone()),
            EvictionStrategy::Lfu => inner
                .map
                .iter()
                .min_by_key(|(_, slot)| (slot.access_count, slot.last_access, slot.insertion_seq))
                .map(|(k, _)| k.clone()),
            EvictionStrategy::Fifo => inner
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.insertion_seq)
                .map(|(k, _)| k.clone()),
        }
    }
}

#[async_trait]
impl CacheStore for VolatileStore {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        let mut inner = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();
        if let Some(slot) = inner.map.get_mut(key) {
            slot.last_access = now;
            slot.access_count += 1;
            Ok(Some(slot.entry.clone()))
        } else {
            Ok(None)
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<bool> {
        let new_size = entry.size_in_bytes();
        if new_size > self.max_bytes {
            return Ok(false);
        }
        let mut inner = self.inner.lock().await;
        if let Some(old) = inner.map.remove(key) {
            inner.current_bytes -= old.size;
        }
        while (inner.map.len() as u64 >= self.max_entries
            || inner.current_bytes + new_size > self.max_bytes)
            && !inner.map.is_empty()
        {
            if let Some(victim) = self.select_victim(&inner) {
                if let Some(removed) = inner.map.remove(&victim) {
                    inner.current_bytes -= removed.size;
                }
            } else {
                break;
            }
        }
        let now = OffsetDateTime::now_utc();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.map.insert(
            key.to_string(),
            VolatileSlot {
                entry: Arc::new(entry),
                size: new_size,
                last_access: now,
                access_count: 0,
                insertion_seq: seq,
            },
        );
        inner.current_bytes += new_size;
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if let Some(removed) = inner.map.remove(key) {
            inner.current_bytes -= removed.size;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.map.contains_key(key))
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.map.clear();
        inner.current_bytes = 0;
        Ok(())
    }

    async fn clear_where(
        &self,
        predicate: &(dyn Fn(&CacheEntry) -> bool + Send + Sync),
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let doomed: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, slot)| predicate(&slot.entry))
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            if let Some(removed) = inner.map.remove(&key) {
                inner.current_bytes -= removed.size;
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.map.keys().cloned().collect())
    }

    async fn size(&self) -> Result<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.map.len() as u64)
    }

    async fn size_in_bytes(&self) -> Result<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.current_bytes)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
