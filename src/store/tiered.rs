//! L1-then-L2 composer: reads prefer L1 with best-effort promotion,
//! writes go to both with logical-OR success, and size/keys queries
//! treat L2 as authoritative (per §4.10).

use crate::entry::CacheEntry;
use crate::error::Result;
use crate::store::durable::DurableStore;
use crate::store::volatile::VolatileStore;
use crate::store::CacheStore;
use async_trait::async_trait;
use log::{debug, trace};
use std::sync::Arc;

/// Composes a volatile L1 tier over a durable L2 tier behind one
/// [`CacheStore`] implementation.
pub struct TieredStore {
    l1: VolatileStore,
    l2: DurableStore,
}

impl TieredStore {
    /// Compose an existing L1 and L2 tier into one store.
    pub fn new(l1: VolatileStore, l2: DurableStore) -> Self {
        Self { l1, l2 }
    }
}

#[async_trait]
impl CacheStore for TieredStore {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        if let Some(entry) = self.l1.get(key).await? {
            return Ok(Some(entry));
        }
        match self.l2.get(key).await? {
            Some(entry) => {
                // Best-effort promotion: a failure to fit in L1 is not an
                // error, the caller still gets the L2 result.
                if let Err(e) = self.l1.put(key, (*entry).clone()).await {
                    trace!("L1 promotion failed for {key}: {e}");
                }
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<bool> {
        let l1_ok = self.l1.put(key, entry.clone()).await.unwrap_or_else(|e| {
            debug!("L1 write failed for {key}: {e}");
            false
        });
        let l2_ok = self.l2.put(key, entry).await?;
        Ok(l1_ok || l2_ok)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let l1_removed = self.l1.remove(key).await?;
        let l2_removed = self.l2.remove(key).await?;
        Ok(l1_removed || l2_removed)
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        if self.l1.contains(key).await? {
            return Ok(true);
        }
        self.l2.contains(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.l1.clear().await?;
        self.l2.clear().await
    }

    async fn clear_where(
        &self,
        predicate: &(dyn Fn(&CacheEntry) -> bool + Send + Sync),
    ) -> Result<()> {
        self.l1.clear_where(predicate).await?;
        self.l2.clear_where(predicate).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.l1.keys().await?;
        for key in self.l2.keys().await? {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn size(&self) -> Result<u64> {
        self.l2.size().await
    }

    async fn size_in_bytes(&self) -> Result<u64> {
        self.l2.size_in_bytes().await
    }

    async fn close(&self) -> Result<()> {
        self.l1.close().await?;
        self.l2.close().await
    }
}
