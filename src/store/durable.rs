//! L2: a `cacache`-backed content store with a companion index giving
//! the `access_time`/`access_count`/`created_time` ordering §4.9 asks
//! for. `cacache` holds the postcard-encoded entry bytes; the index is
//! itself a small postcard-encoded file written alongside it.

use crate::config::EvictionStrategy;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::store::CacheStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

const INDEX_FILE_NAME: &str = "index.postcard";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRow {
    #[serde(with = "time::serde::rfc3339")]
    access_time: OffsetDateTime,
    access_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    created_time: OffsetDateTime,
    size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct DurableIndex {
    schema_version: u32,
    rows: HashMap<String, IndexRow>,
}

/// The durable (L2) tier.
pub struct DurableStore {
    path: PathBuf,
    index: Mutex<DurableIndex>,
    max_bytes: u64,
    max_entries: u64,
    strategy: EvictionStrategy,
}

impl DurableStore {
    /// Open (creating if absent) a durable store rooted at `path`,
    /// loading its index from a previous run if one exists.
    pub async fn open(
        path: impl AsRef<Path>,
        max_bytes: u64,
        max_entries: u64,
        strategy: EvictionStrategy,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&path).await?;
        let index = Self::load_index(&path).await?;
        Ok(Self { path, index: Mutex::new(index), max_bytes, max_entries, strategy })
    }

    async fn load_index(path: &Path) -> Result<DurableIndex> {
        let index_path = path.join(INDEX_FILE_NAME);
        match tokio::fs::read(&index_path).await {
            Ok(bytes) => {
                let index: DurableIndex =
                    postcard::from_bytes(&bytes).map_err(CacheError::Serialize)?;
                Ok(index)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(DurableIndex { schema_version: SCHEMA_VERSION, rows: HashMap::new() })
            }
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    async fn persist_index(&self, index: &DurableIndex) -> Result<()> {
        let bytes = postcard::to_allocvec(index).map_err(CacheError::Serialize)?;
        let final_path = self.path.join(INDEX_FILE_NAME);
        let tmp_path = self.path.join(format!("{INDEX_FILE_NAME}.tmp"));
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    fn select_victim(&self, index: &DurableIndex) -> Option<String> {
        match self.strategy {
            EvictionStrategy::Lru | EvictionStrategy::Ttl => {
                index.rows.iter().min_by_key(|(_, row)| row.access_time).map(|(k, _)| k.clone())
            }
            EvictionStrategy::Lfu => index
                .rows
                .iter()
                .min_by_key(|(_, row)| (row.access_count, row.access_time))
                .map(|(k, _)| k.clone()),
            EvictionStrategy::Fifo => {
                index.rows.iter().min_by_key(|(_, row)| row.created_time).map(|(k, _)| k.clone())
            }
        }
    }

    fn current_bytes(index: &DurableIndex) -> u64 {
        index.rows.values().map(|r| r.size).sum()
    }
}

#[async_trait]
impl CacheStore for DurableStore {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        // Any read failure (including "not found") is treated as a miss,
        // matching the convention cacache-backed managers use elsewhere.
        let bytes = match cacache::read(&self.path, key).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };
        let entry: CacheEntry = postcard::from_bytes(&bytes).map_err(CacheError::Serialize)?;
        let mut index = self.index.lock().await;
        if let Some(row) = index.rows.get_mut(key) {
            row.access_time = OffsetDateTime::now_utc();
            row.access_count += 1;
        }
        let snapshot = index.clone();
        drop(index);
        self.persist_index(&snapshot).await?;
        Ok(Some(Arc::new(entry)))
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<bool> {
        let new_size = entry.size_in_bytes();
        if new_size > self.max_bytes {
            return Ok(false);
        }
        let mut index = self.index.lock().await;
        if let Some(old) = index.rows.remove(key) {
            let _ = old;
        }
        while (index.rows.len() as u64 >= self.max_entries
            || Self::current_bytes(&index) + new_size > self.max_bytes)
            && !index.rows.is_empty()
        {
            if let Some(victim) = self.select_victim(&index) {
                index.rows.remove(&victim);
                cacache::remove(&self.path, &victim).await.map_err(CacheError::CaCache)?;
            } else {
                break;
            }
        }
        let bytes = postcard::to_allocvec(&entry).map_err(CacheError::Serialize)?;
        cacache::write(&self.path, key, bytes).await.map_err(CacheError::CaCache)?;
        let now = OffsetDateTime::now_utc();
        index.rows.insert(
            key.to_string(),
            IndexRow { access_time: now, access_count: 0, created_time: now, size: new_size },
        );
        let snapshot = index.clone();
        drop(index);
        self.persist_index(&snapshot).await?;
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut index = self.index.lock().await;
        let existed = index.rows.remove(key).is_some();
        if existed {
            cacache::remove(&self.path, key).await.map_err(CacheError::CaCache)?;
            let snapshot = index.clone();
            drop(index);
            self.persist_index(&snapshot).await?;
        }
        Ok(existed)
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let index = self.index.lock().await;
        Ok(index.rows.contains_key(key))
    }

    async fn clear(&self) -> Result<()> {
        cacache::clear(&self.path).await.map_err(CacheError::CaCache)?;
        let mut index = self.index.lock().await;
        index.rows.clear();
        let snapshot = index.clone();
        drop(index);
        self.persist_index(&snapshot).await?;
        Ok(())
    }

    async fn clear_where(
        &self,
        predicate: &(dyn Fn(&CacheEntry) -> bool + Send + Sync),
    ) -> Result<()> {
        let keys: Vec<String> = {
            let index = self.index.lock().await;
            index.rows.keys().cloned().collect()
        };
        for key in keys {
            if let Some(entry) = self.get(&key).await? {
                if predicate(&entry) {
                    self.remove(&key).await?;
                }
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let index = self.index.lock().await;
        Ok(index.rows.keys().cloned().collect())
    }

    async fn size(&self) -> Result<u64> {
        let index = self.index.lock().await;
        Ok(index.rows.len() as u64)
    }

    async fn size_in_bytes(&self) -> Result<u64> {
        let index = self.index.lock().await;
        Ok(Self::current_bytes(&index))
    }

    async fn close(&self) -> Result<()> {
        let index = self.index.lock().await;
        self.persist_index(&index).await
    }
}
