//! Engine-wide configuration. Immutable once the engine is built; there is
//! no interior mutability here, matching the "configuration is immutable
//! after construction" rule in the concurrency model.

use std::path::PathBuf;
use std::time::Duration;

/// Whether the engine behaves as a single-user (private) or multi-user
/// (shared) cache. Controls `private` storability and `s-maxage`/
/// `proxy-revalidate` handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheType {
    /// Single-user cache: `private` responses are storable, `s-maxage`
    /// and `proxy-revalidate` are ignored.
    #[default]
    Private,
    /// Multi-user cache: `private` responses are rejected, `s-maxage`
    /// takes precedence over `max-age`.
    Shared,
}

/// Volatile-tier eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionStrategy {
    /// Evict the least-recently-accessed entry.
    #[default]
    Lru,
    /// Evict the least-frequently-accessed entry.
    Lfu,
    /// Evict the earliest-inserted entry, regardless of access pattern.
    Fifo,
    /// Falls back to `Lru`; see DESIGN.md's Open Question decisions.
    Ttl,
}

/// Per-request caching intent, named `CacheIntent` to avoid colliding with
/// the RFC-policy vocabulary used internally by the decider/validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheIntent {
    /// Consult the store, validating or falling back to the network as
    /// freshness requires.
    #[default]
    Standard,
    /// Bypass the store entirely.
    NetworkOnly,
    /// Serve a fresh or stale stored entry without validation if present,
    /// otherwise fall back to the network.
    CacheFirst,
    /// Serve only from the store; never fall back to the network.
    CacheOnly,
    /// Prefer the network, falling back to the store on failure.
    NetworkFirst,
}

/// Engine-wide configuration, built via the `with_*` chain below and then
/// consumed by value when constructing an [`crate::engine::Engine`].
#[derive(Debug, Clone)]
pub struct CacheEngineConfig {
    /// Byte budget for the volatile (L1) tier.
    pub max_memory_bytes: u64,
    /// Entry-count budget for the volatile (L1) tier.
    pub max_memory_entries: u64,
    /// Byte budget for the durable (L2) tier.
    pub max_disk_bytes: u64,
    /// Entry-count budget for the durable (L2) tier.
    pub max_disk_entries: u64,
    /// Single-user vs. multi-user cache semantics.
    pub cache_type: CacheType,
    /// Volatile-tier eviction policy.
    pub eviction_strategy: EvictionStrategy,
    /// Whether heuristic freshness (RFC 7234 §4.2.2) applies when a
    /// response carries no explicit expiration.
    pub enable_heuristic_freshness: bool,
    /// Fraction of a resource's age used as its heuristic freshness
    /// lifetime.
    pub heuristic_percentage: f64,
    /// Upper bound on a heuristic freshness lifetime.
    pub max_heuristic_duration: Duration,
    /// Whether a stale entry may be served when the network is
    /// unreachable.
    pub serve_stale_on_error: bool,
    /// Upper bound on how stale an entry may be when served on error.
    pub max_stale_age: Duration,
    /// Whether the cache key incorporates a caller-supplied site/origin
    /// discriminator in addition to method and URI.
    pub double_key_cache: bool,
    /// Filesystem path backing the durable tier. `None` uses an
    /// in-memory-only durable tier (test/ephemeral use).
    pub database_path: Option<PathBuf>,
    /// Whether the engine emits `tracing` events for cache decisions.
    pub enable_logging: bool,
}

impl Default for CacheEngineConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 10 * 1024 * 1024,
            max_memory_entries: 100,
            max_disk_bytes: 50 * 1024 * 1024,
            max_disk_entries: 1000,
            cache_type: CacheType::Private,
            eviction_strategy: EvictionStrategy::Lru,
            enable_heuristic_freshness: true,
            heuristic_percentage: 0.10,
            max_heuristic_duration: Duration::from_secs(7 * 24 * 60 * 60),
            serve_stale_on_error: true,
            max_stale_age: Duration::from_secs(24 * 60 * 60),
            double_key_cache: false,
            database_path: None,
            enable_logging: false,
        }
    }
}

impl CacheEngineConfig {
    /// Construct a config with the spec's default budgets and policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the volatile tier's byte budget.
    pub fn with_max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Set the volatile tier's entry-count budget.
    pub fn with_max_memory_entries(mut self, entries: u64) -> Self {
        self.max_memory_entries = entries;
        self
    }

    /// Set the durable tier's byte budget.
    pub fn with_max_disk_bytes(mut self, bytes: u64) -> Self {
        self.max_disk_bytes = bytes;
        self
    }

    /// Set the durable tier's entry-count budget.
    pub fn with_max_disk_entries(mut self, entries: u64) -> Self {
        self.max_disk_entries = entries;
        self
    }

    /// Set whether the engine behaves as a private or shared cache.
    pub fn with_cache_type(mut self, cache_type: CacheType) -> Self {
        self.cache_type = cache_type;
        self
    }

    /// Set the volatile tier's eviction policy.
    pub fn with_eviction_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.eviction_strategy = strategy;
        self
    }

    /// Enable or disable heuristic freshness for responses without
    /// explicit expiration.
    pub fn with_heuristic_freshness(mut self, enabled: bool) -> Self {
        self.enable_heuristic_freshness = enabled;
        self
    }

    /// Set the fraction of age used to compute heuristic freshness.
    pub fn with_heuristic_percentage(mut self, percentage: f64) -> Self {
        self.heuristic_percentage = percentage;
        self
    }

    /// Set the upper bound on a heuristic freshness lifetime.
    pub fn with_max_heuristic_duration(mut self, duration: Duration) -> Self {
        self.max_heuristic_duration = duration;
        self
    }

    /// Enable or disable serving stale entries when the network errors.
    pub fn with_serve_stale_on_error(mut self, enabled: bool) -> Self {
        self.serve_stale_on_error = enabled;
        self
    }

    /// Set the upper bound on how stale an entry may be when served on
    /// error.
    pub fn with_max_stale_age(mut self, duration: Duration) -> Self {
        self.max_stale_age = duration;
        self
    }

    /// Enable or disable mixing a site/origin discriminator into the
    /// cache key.
    pub fn with_double_key_cache(mut self, enabled: bool) -> Self {
        self.double_key_cache = enabled;
        self
    }

    /// Set the filesystem path backing the durable tier.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Enable or disable `tracing` events for cache decisions.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}
