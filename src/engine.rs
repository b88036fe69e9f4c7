//! The engine facade: the single entry point that wires configuration,
//! key generation, the parser, the age/freshness calculator, the
//! storability/reusability decider, the validator, the invalidator, and
//! the tiered store together.

use crate::config::{CacheEngineConfig, CacheIntent, CacheType};
use crate::decider;
use crate::entry::{CacheEntry, CachedResponse, ReusabilityResult, StorabilityResult};
use crate::error::Result;
use crate::freshness;
use crate::header::{self, CacheControl};
use crate::invalidator;
use crate::key;
use crate::store::durable::DurableStore;
use crate::store::tiered::TieredStore;
use crate::store::volatile::VolatileStore;
use crate::store::CacheStore;
use crate::validator;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use log::{debug, trace};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

/// Point-in-time counts/bytes across the tiered store, as returned by
/// `getStats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries resident in the tiered store.
    pub entries: u64,
    /// Total bytes accounted across those entries.
    pub bytes: u64,
}

/// A minimal request/response bundle for the ergonomic API. Destructures
/// into the same primitive-args call the flat API uses; it is not a
/// second code path (see the Open Question decision in DESIGN.md).
#[derive(Debug)]
pub struct CacheRequest<'a> {
    /// The request method.
    pub method: &'a Method,
    /// The request target.
    pub uri: &'a Uri,
    /// The request headers.
    pub headers: &'a HeaderMap,
}

/// The response half of the ergonomic bundle, passed to [`Engine::put`]
/// by destructuring rather than as a second code path.
#[derive(Debug)]
pub struct CacheResponse<'a> {
    /// The response status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: &'a HeaderMap,
    /// The response body.
    pub body: Bytes,
}

/// The caching engine. Owns its configuration and the tiered store built
/// from it (unless a caller supplies a custom [`CacheStore`] via
/// [`Engine::with_store`]).
pub struct Engine {
    config: CacheEngineConfig,
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Engine {
    /// Build the default tiered composer (L1 volatile + L2 durable) from
    /// `config`.
    pub async fn new(config: CacheEngineConfig) -> Result<Self> {
        let l1 = VolatileStore::new(
            config.max_memory_bytes,
            config.max_memory_entries,
            config.eviction_strategy,
        );
        let database_path =
            config.database_path.clone().unwrap_or_else(|| PathBuf::from("./http-cache-engine"));
        let l2 = DurableStore::open(
            database_path,
            config.max_disk_bytes,
            config.max_disk_entries,
            config.eviction_strategy,
        )
        .await?;
        let store = Arc::new(TieredStore::new(l1, l2));
        Ok(Self { config, store })
    }

    /// Build an engine over a caller-supplied storage backend (the
    /// `customStorage` configuration knob, expressed as a constructor
    /// parameter since Rust has no "unset -> default" field for trait
    /// objects).
    pub fn with_store(config: CacheEngineConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { config, store }
    }

    fn key_for(&self, method: &Method, uri: &Uri, site: Option<&str>) -> String {
        let site = if self.config.double_key_cache { site } else { None };
        key::primary_key(method, uri, site)
    }

    /// §4.11 `get`. `site` is only consulted when `double_key_cache` is
    /// enabled in the configuration.
    pub async fn get(
        &self,
        method: &Method,
        uri: &Uri,
        request_headers: &HeaderMap,
        policy: CacheIntent,
        site: Option<&str>,
    ) -> Result<Option<CachedResponse>> {
        let request_cc = header::parse_cache_control_header(request_headers, true);
        let effective_policy =
            if request_cc.only_if_cached() { CacheIntent::CacheOnly } else { policy };

        let lookup_key = self.key_for(method, uri, site);
        let entry = match self.store.get(&lookup_key).await? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let response_cc = header::parse_cache_control_header(&entry.headers, false);
        let now = OffsetDateTime::now_utc();
        let age = freshness::current_age(&entry.headers, entry.request_time, entry.response_time, now);
        let lifetime = freshness::entry_freshness_lifetime(
            &entry,
            self.config.cache_type,
            self.config.enable_heuristic_freshness,
            self.config.heuristic_percentage,
            self.config.max_heuristic_duration,
        );

        let reuse = decider::can_reuse(
            method,
            uri,
            request_headers,
            &entry,
            &request_cc,
            &response_cc,
            age,
            lifetime,
        );

        match reuse {
            ReusabilityResult::Rejected(reason) => {
                trace!("not reusable for {uri}: {reason}");
                Ok(None)
            }
            ReusabilityResult::Reusable => {
                Ok(Some(CachedResponse { entry, age, is_stale: false, requires_validation: false }))
            }
            ReusabilityResult::RequiresValidation => {
                let is_fresh = freshness::is_fresh(age, lifetime);
                if !is_fresh
                    && matches!(effective_policy, CacheIntent::CacheFirst | CacheIntent::CacheOnly)
                {
                    Ok(Some(CachedResponse {
                        entry,
                        age,
                        is_stale: true,
                        requires_validation: false,
                    }))
                } else {
                    Ok(Some(CachedResponse {
                        entry,
                        age,
                        is_stale: !is_fresh,
                        requires_validation: true,
                    }))
                }
            }
        }
    }

    /// Ergonomic wrapper over [`Engine::get`].
    pub async fn get_request(
        &self,
        request: &CacheRequest<'_>,
        policy: CacheIntent,
        site: Option<&str>,
    ) -> Result<Option<CachedResponse>> {
        self.get(request.method, request.uri, request.headers, policy, site).await
    }

    /// §4.11 `put`.
    #[allow(clippy::too_many_arguments)]
    pub async fn put(
        &self,
        method: &Method,
        uri: &Uri,
        status: StatusCode,
        request_headers: &HeaderMap,
        response_headers: &HeaderMap,
        body: Bytes,
        request_time: OffsetDateTime,
        response_time: OffsetDateTime,
        site: Option<&str>,
    ) -> Result<bool> {
        let request_cc = header::parse_cache_control_header(request_headers, true);
        let response_cc = header::parse_cache_control_header(response_headers, false);

        let storability = decider::can_store(
            method,
            status,
            request_headers,
            response_headers,
            &request_cc,
            &response_cc,
            self.config.cache_type,
        );
        if let StorabilityResult::Rejected(reason) = storability {
            debug!("not storing {uri}: {reason}");
            return Ok(false);
        }

        let mut headers = response_headers.clone();
        header::strip_prohibited_headers(&mut headers);

        let vary_value = header::header_str(&headers, "vary").map(|s| s.to_string());
        let vary_headers = key::extract_vary_headers(vary_value.as_deref(), request_headers);
        let is_incomplete = status == StatusCode::PARTIAL_CONTENT;
        let content_range = if is_incomplete {
            header::header_str(&headers, "content-range").map(|s| s.to_string())
        } else {
            None
        };

        let entry = CacheEntry {
            method: method.clone(),
            uri: uri.clone(),
            status_code: status,
            headers,
            body: body.to_vec(),
            request_time,
            response_time,
            vary_headers,
            is_incomplete,
            content_range,
            is_invalid: false,
        };

        let store_key = self.key_for(method, uri, site);
        self.store.put(&store_key, entry).await
    }

    /// §4.5 `updateFrom304`. Returns `Ok(None)` both on a cache miss and
    /// on a validator mismatch (§7: "Validation mismatch on 304" is
    /// non-propagating: the caller treats the 304 as a normal response).
    pub async fn update_from_304(
        &self,
        method: &Method,
        uri: &Uri,
        response_304_headers: &HeaderMap,
        request_time: OffsetDateTime,
        response_time: OffsetDateTime,
        site: Option<&str>,
    ) -> Result<Option<Arc<CacheEntry>>> {
        let lookup_key = self.key_for(method, uri, site);
        let Some(existing) = self.store.get(&lookup_key).await? else {
            return Ok(None);
        };
        if !validator::validators_match(&existing, response_304_headers) {
            debug!("304 validators did not match stored entry for {uri}");
            return Ok(None);
        }
        let updated =
            validator::update_from_304(&existing, response_304_headers, request_time, response_time);
        self.store.put(&lookup_key, updated.clone()).await?;
        Ok(Some(Arc::new(updated)))
    }

    /// Optional HEAD-based freshening (Open Question 2): distinct from
    /// `update_from_304`, callers opt in explicitly.
    pub async fn freshen_from_head(
        &self,
        method: &Method,
        uri: &Uri,
        head_response_headers: &HeaderMap,
        request_time: OffsetDateTime,
        response_time: OffsetDateTime,
        site: Option<&str>,
    ) -> Result<Option<Arc<CacheEntry>>> {
        let lookup_key = self.key_for(method, uri, site);
        let Some(existing) = self.store.get(&lookup_key).await? else {
            return Ok(None);
        };
        let Some(updated) =
            validator::freshen_from_head(&existing, head_response_headers, request_time, response_time)
        else {
            return Ok(None);
        };
        self.store.put(&lookup_key, updated.clone()).await?;
        Ok(Some(Arc::new(updated)))
    }

    /// §4.6 `invalidateOnUnsafeMethod`. Completes before returning, per
    /// the ordering guarantee in §5(b).
    pub async fn invalidate_on_unsafe_method(
        &self,
        method: &Method,
        uri: &Uri,
        status: StatusCode,
        response_headers: &HeaderMap,
    ) -> Result<()> {
        let keys = invalidator::keys_to_invalidate(method, uri, status, response_headers);
        debug!("invalidating {} key(s) for {uri}", keys.len());
        for key in keys {
            self.store.remove(&key).await?;
        }
        Ok(())
    }

    /// A predicate-clear over any origin's entries (`invalidateOrigin`).
    pub async fn invalidate_origin(&self, uri: &Uri) -> Result<()> {
        let target = uri.clone();
        self.store.clear_where(&move |entry: &CacheEntry| entry.uri == target).await
    }

    /// A general predicate-clear (`invalidatePattern`).
    pub async fn invalidate_pattern(
        &self,
        predicate: &(dyn Fn(&CacheEntry) -> bool + Send + Sync),
    ) -> Result<()> {
        self.store.clear_where(predicate).await
    }

    /// §4.5 validation-header generation, delegated to the validator.
    pub fn generate_validation_headers(&self, base: &HeaderMap, entry: &CacheEntry) -> HeaderMap {
        validator::conditional_request_headers(base, entry)
    }

    /// Whether an otherwise-stale entry may still be served, combining
    /// the raw RFC rule with the engine's `serve_stale_on_error`/
    /// `max_stale_age` configuration for the disconnected-caller case.
    pub fn allows_stale_serving(
        &self,
        response_cc: &CacheControl,
        request_cc: &CacheControl,
        age: u64,
        lifetime: u64,
        caller_disconnected: bool,
    ) -> bool {
        if response_cc.must_revalidate() {
            return false;
        }
        if self.config.cache_type == CacheType::Shared && response_cc.proxy_revalidate() {
            return false;
        }
        if caller_disconnected {
            return self.config.serve_stale_on_error
                && age.saturating_sub(lifetime) <= self.config.max_stale_age.as_secs();
        }
        match request_cc.max_stale() {
            Some(None) => true,
            Some(Some(max_stale)) => age.saturating_sub(lifetime) <= max_stale,
            None => false,
        }
    }

    /// Remove every stored entry.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    /// `clearWhere(entry -> !isFresh(entry, ...))`.
    pub async fn clear_expired(&self) -> Result<()> {
        let cache_type = self.config.cache_type;
        let enable_heuristic = self.config.enable_heuristic_freshness;
        let heuristic_percentage = self.config.heuristic_percentage;
        let max_heuristic_duration = self.config.max_heuristic_duration;
        let now = OffsetDateTime::now_utc();
        let predicate = move |entry: &CacheEntry| {
            let age = freshness::current_age(
                &entry.headers,
                entry.request_time,
                entry.response_time,
                now,
            );
            let lifetime = freshness::entry_freshness_lifetime(
                entry,
                cache_type,
                enable_heuristic,
                heuristic_percentage,
                max_heuristic_duration,
            );
            !freshness::is_fresh(age, lifetime)
        };
        self.store.clear_where(&predicate).await
    }

    /// Point-in-time entry/byte counts across the store (`getStats`).
    pub async fn get_stats(&self) -> Result<CacheStats> {
        let entries = self.store.size().await?;
        let bytes = self.store.size_in_bytes().await?;
        Ok(CacheStats { entries, bytes })
    }

    /// Flush and release any resources held by the underlying store.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}
