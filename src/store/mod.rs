//! The storage contract any backend must honor (§4.7), and the three
//! concrete implementations that satisfy it.

pub mod durable;
pub mod tiered;
pub mod volatile;

use crate::entry::CacheEntry;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// CRUD + predicate-clear + size probes over cache entries keyed by an
/// opaque string (the output of `key::primary_key`/`key::vary_qualified_key`).
///
/// Every method is declared `async` because each may suspend on I/O
/// (§5); implementations backed by pure in-memory state simply never
/// await anything.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the entry stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>>;

    /// Returns `false` when the entry was rejected for being individually
    /// too large for the configured byte bound; `true` otherwise, after
    /// best-effort eviction of other entries.
    async fn put(&self, key: &str, entry: CacheEntry) -> Result<bool>;

    /// Remove the entry stored under `key`, returning whether one was
    /// present.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Whether an entry is stored under `key`.
    async fn contains(&self, key: &str) -> Result<bool>;

    /// Remove every stored entry.
    async fn clear(&self) -> Result<()>;

    /// Remove every entry for which `predicate` returns `true`.
    async fn clear_where(&self, predicate: &(dyn Fn(&CacheEntry) -> bool + Send + Sync)) -> Result<()>;

    /// All keys currently stored.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Number of entries currently stored.
    async fn size(&self) -> Result<u64>;

    /// Total bytes accounted across all stored entries.
    async fn size_in_bytes(&self) -> Result<u64>;

    /// Flush and release any resources held by this store.
    async fn close(&self) -> Result<()>;
}
