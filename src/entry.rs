//! The stored response snapshot and the value types that travel with it
//! across the engine boundary.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use time::OffsetDateTime;

/// One immutable stored response. A 304 or HEAD-freshening produces a new
/// `CacheEntry`, never an in-place mutation of this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The request method this entry was stored under.
    #[serde(with = "http_serde::method")]
    pub method: Method,
    /// The request target this entry was stored under.
    #[serde(with = "http_serde::uri")]
    pub uri: Uri,
    /// The stored response's status code.
    #[serde(with = "http_serde::status_code")]
    pub status_code: StatusCode,
    /// The stored response's headers, with hop-by-hop and other
    /// prohibited-for-storage headers already stripped.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// The stored response body.
    pub body: Vec<u8>,
    /// When the originating request was made.
    #[serde(with = "time::serde::rfc3339")]
    pub request_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    /// When the originating response was received.
    pub response_time: OffsetDateTime,
    /// The request header values named by the response's `Vary` header,
    /// captured at store time for later matching. `None` if the response
    /// carried no `Vary`.
    pub vary_headers: Option<BTreeMap<String, String>>,
    /// Whether this entry was stored from a `206 Partial Content`
    /// response.
    pub is_incomplete: bool,
    /// The stored `Content-Range` value, present only when
    /// [`CacheEntry::is_incomplete`] is set.
    pub content_range: Option<String>,
    /// Tombstone flag set by invalidation; an invalid entry is never
    /// reused and is eligible for physical removal.
    pub is_invalid: bool,
}

impl CacheEntry {
    /// Deterministic byte accounting: body + headers (name+value) + uri +
    /// method + vary-headers contribution, per §3's invariant.
    pub fn size_in_bytes(&self) -> u64 {
        let mut size = self.body.len() as u64;
        for (name, value) in self.headers.iter() {
            size += name.as_str().len() as u64;
            size += value.as_bytes().len() as u64;
        }
        size += self.uri.to_string().len() as u64;
        size += self.method.as_str().len() as u64;
        if let Some(vary) = &self.vary_headers {
            for (k, v) in vary {
                size += k.len() as u64 + v.len() as u64;
            }
        }
        size
    }

    /// The body as a cheaply-cloneable [`Bytes`], copied from the owned
    /// `Vec<u8>` backing this entry.
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.body)
    }
}

/// Engine return value on a successful `get`.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// The matched stored entry.
    pub entry: Arc<CacheEntry>,
    /// The entry's current age in seconds, per the RFC 7234 §4.2.3
    /// algorithm.
    pub age: u64,
    /// Whether the entry's age exceeds its freshness lifetime.
    pub is_stale: bool,
    /// Whether the caller must validate before reuse (stale without a
    /// permissive `max-stale`, or fresh but carrying `no-cache`).
    pub requires_validation: bool,
}

/// Reason codes reported by the storability/reusability deciders, used
/// both for the caller-visible rejection and for the engine's own
/// `debug!` log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The request carried `Cache-Control: no-store`.
    NoStoreRequest,
    /// The response carried `Cache-Control: no-store`.
    NoStoreResponse,
    /// The request method is never cacheable.
    MethodNotCacheable,
    /// The response status is not a final (non-1xx) status.
    StatusNotFinal,
    /// The response carried `private` and the cache is shared.
    PrivateResponseInSharedCache,
    /// The request carried `Authorization` without a response directive
    /// that overrides it.
    AuthorizationWithoutOverride,
    /// Neither an explicit freshness directive nor heuristic eligibility
    /// permits storage.
    NoStorageIndicator,
    /// The stored entry has been tombstoned by invalidation.
    EntryInvalid,
    /// The request method is not safe for cache reuse.
    MethodNotSafeForReuse,
    /// The request's URI does not match the stored entry's.
    UriMismatch,
    /// The stored entry carries `Vary: *`, which never matches.
    VaryStarNeverMatches,
    /// One or more `Vary`-named request headers differ from the stored
    /// values.
    VaryMismatch,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            RejectReason::NoStoreRequest => "request carried no-store",
            RejectReason::NoStoreResponse => "response carried no-store",
            RejectReason::MethodNotCacheable => "method is not cacheable",
            RejectReason::StatusNotFinal => "status is not a final response",
            RejectReason::PrivateResponseInSharedCache => "private response in a shared cache",
            RejectReason::AuthorizationWithoutOverride => {
                "authenticated request without public/must-revalidate/s-maxage"
            }
            RejectReason::NoStorageIndicator => "no storage indicator present",
            RejectReason::EntryInvalid => "entry is tombstoned",
            RejectReason::MethodNotSafeForReuse => "method is not safe-reusable",
            RejectReason::UriMismatch => "request uri does not match stored uri",
            RejectReason::VaryStarNeverMatches => "stored response carried vary: *",
            RejectReason::VaryMismatch => "vary fields do not match",
        };
        f.write_str(msg)
    }
}

/// Outcome of the storability decision made over a request/response pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorabilityResult {
    /// The response may be stored.
    Storable,
    /// The response must not be stored, with the reason why.
    Rejected(RejectReason),
}

impl StorabilityResult {
    /// Whether this result permits storage.
    pub fn is_storable(&self) -> bool {
        matches!(self, StorabilityResult::Storable)
    }
}

/// Outcome of the reusability decision made over a stored entry against
/// an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReusabilityResult {
    /// The entry may be served as-is.
    Reusable,
    /// The entry may be served only after successful validation.
    RequiresValidation,
    /// The entry must not be reused, with the reason why.
    Rejected(RejectReason),
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            method: Method::GET,
            uri: "https://example.com/a".parse().unwrap(),
            status_code: StatusCode::OK,
            headers: HeaderMap::new(),
            body: vec![1, 2, 3],
            request_time: OffsetDateTime::UNIX_EPOCH,
            response_time: OffsetDateTime::UNIX_EPOCH,
            vary_headers: None,
            is_incomplete: false,
            content_range: None,
            is_invalid: false,
        }
    }

    #[test]
    fn size_in_bytes_accounts_for_body_uri_method() {
        let entry = sample_entry();
        let expected = 3u64 + "https://example.com/a".len() as u64 + "GET".len() as u64;
        assert_eq!(entry.size_in_bytes(), expected);
    }

    #[test]
    fn reject_reason_display_is_stable() {
        assert_eq!(RejectReason::NoStoreRequest.to_string(), "request carried no-store");
    }
}
