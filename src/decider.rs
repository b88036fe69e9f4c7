//! Storability (`canStore`) and reusability (`canReuse`) gates.

use crate::config::CacheType;
use crate::entry::{CacheEntry, RejectReason, ReusabilityResult, StorabilityResult};
use crate::freshness;
use crate::header::{self, CacheControl};
use http::{HeaderMap, Method, StatusCode, Uri};

/// §4.4: all conditions must hold for a response to be storable.
pub fn can_store(
    method: &Method,
    status: StatusCode,
    request_headers: &HeaderMap,
    response_headers: &HeaderMap,
    request_cc: &CacheControl,
    response_cc: &CacheControl,
    cache_type: CacheType,
) -> StorabilityResult {
    if request_cc.no_store() {
        return StorabilityResult::Rejected(RejectReason::NoStoreRequest);
    }
    if response_cc.no_store() {
        return StorabilityResult::Rejected(RejectReason::NoStoreResponse);
    }
    if !header::is_cacheable_method(method) {
        return StorabilityResult::Rejected(RejectReason::MethodNotCacheable);
    }
    if !header::is_final_status(status) {
        return StorabilityResult::Rejected(RejectReason::StatusNotFinal);
    }
    if cache_type == CacheType::Shared && response_cc.private() {
        return StorabilityResult::Rejected(RejectReason::PrivateResponseInSharedCache);
    }
    if header::has_header(request_headers, "authorization")
        && !(response_cc.public() || response_cc.must_revalidate() || response_cc.s_maxage().is_some())
    {
        return StorabilityResult::Rejected(RejectReason::AuthorizationWithoutOverride);
    }
    let has_storage_indicator = response_cc.public()
        || (cache_type == CacheType::Private && response_cc.private())
        || response_headers.contains_key(http::header::EXPIRES)
        || response_cc.max_age().is_some()
        || (cache_type == CacheType::Shared && response_cc.s_maxage().is_some())
        || header::is_heuristically_cacheable_status(status);
    if !has_storage_indicator {
        return StorabilityResult::Rejected(RejectReason::NoStorageIndicator);
    }
    StorabilityResult::Storable
}

/// §4.4: gate reuse of a stored entry for the current request. Does not
/// itself compute freshness numbers (that is [`freshness::freshness_lifetime`]
/// and [`freshness::current_age`]), but does consult the outcome.
#[allow(clippy::too_many_arguments)]
pub fn can_reuse(
    method: &Method,
    uri: &Uri,
    request_headers: &HeaderMap,
    entry: &CacheEntry,
    request_cc: &CacheControl,
    response_cc: &CacheControl,
    age: u64,
    lifetime: Option<u64>,
) -> ReusabilityResult {
    if entry.is_invalid {
        return ReusabilityResult::Rejected(RejectReason::EntryInvalid);
    }
    if !header::is_safe_reusable_method(method) {
        return ReusabilityResult::Rejected(RejectReason::MethodNotSafeForReuse);
    }
    if &entry.uri != uri {
        return ReusabilityResult::Rejected(RejectReason::UriMismatch);
    }
    if let Some(vary) = &entry.vary_headers {
        if vary.contains_key("*") {
            return ReusabilityResult::Rejected(RejectReason::VaryStarNeverMatches);
        }
    }
    if !crate::key::vary_matches(&entry.vary_headers, request_headers) {
        return ReusabilityResult::Rejected(RejectReason::VaryMismatch);
    }
    if response_cc.no_cache() || request_cc.no_cache() {
        return ReusabilityResult::RequiresValidation;
    }
    if !freshness::is_fresh(age, lifetime) {
        return ReusabilityResult::RequiresValidation;
    }
    ReusabilityResult::Reusable
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::header::parse_cache_control;
    use http::HeaderValue;
    use time::OffsetDateTime;

    fn entry_with_vary(vary: Option<std::collections::BTreeMap<String, String>>) -> CacheEntry {
        CacheEntry {
            method: Method::GET,
            uri: "https://example.com/a".parse().unwrap(),
            status_code: StatusCode::OK,
            headers: HeaderMap::new(),
            body: vec![],
            request_time: OffsetDateTime::UNIX_EPOCH,
            response_time: OffsetDateTime::UNIX_EPOCH,
            vary_headers: vary,
            is_incomplete: false,
            content_range: None,
            is_invalid: false,
        }
    }

    #[test]
    fn no_store_on_request_rejects() {
        let req_cc = parse_cache_control("no-store", true);
        let res_cc = parse_cache_control("max-age=60", false);
        let result = can_store(
            &Method::GET,
            StatusCode::OK,
            &HeaderMap::new(),
            &HeaderMap::new(),
            &req_cc,
            &res_cc,
            CacheType::Private,
        );
        assert_eq!(result, StorabilityResult::Rejected(RejectReason::NoStoreRequest));
    }

    #[test]
    fn private_response_rejected_in_shared_cache() {
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("private, max-age=60", false);
        let result = can_store(
            &Method::GET,
            StatusCode::OK,
            &HeaderMap::new(),
            &HeaderMap::new(),
            &req_cc,
            &res_cc,
            CacheType::Shared,
        );
        assert_eq!(
            result,
            StorabilityResult::Rejected(RejectReason::PrivateResponseInSharedCache)
        );
    }

    #[test]
    fn authorization_without_override_rejected() {
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("max-age=60", false);
        let mut req_headers = HeaderMap::new();
        req_headers.insert("authorization", HeaderValue::from_static("Bearer xyz"));
        let result = can_store(
            &Method::GET,
            StatusCode::OK,
            &req_headers,
            &HeaderMap::new(),
            &req_cc,
            &res_cc,
            CacheType::Private,
        );
        assert_eq!(
            result,
            StorabilityResult::Rejected(RejectReason::AuthorizationWithoutOverride)
        );
    }

    #[test]
    fn authorization_with_must_revalidate_is_storable() {
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("max-age=60, must-revalidate", false);
        let mut req_headers = HeaderMap::new();
        req_headers.insert("authorization", HeaderValue::from_static("Bearer xyz"));
        let result = can_store(
            &Method::GET,
            StatusCode::OK,
            &req_headers,
            &HeaderMap::new(),
            &req_cc,
            &res_cc,
            CacheType::Private,
        );
        assert_eq!(result, StorabilityResult::Storable);
    }

    #[test]
    fn post_method_never_reusable() {
        let entry = entry_with_vary(None);
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("max-age=60", false);
        let uri = entry.uri.clone();
        let result = can_reuse(
            &Method::POST,
            &uri,
            &HeaderMap::new(),
            &entry,
            &req_cc,
            &res_cc,
            10,
            Some(60),
        );
        assert_eq!(
            result,
            ReusabilityResult::Rejected(RejectReason::MethodNotSafeForReuse)
        );
    }

    #[test]
    fn vary_star_never_reusable() {
        let mut vary = std::collections::BTreeMap::new();
        vary.insert("*".to_string(), "*".to_string());
        let entry = entry_with_vary(Some(vary));
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("max-age=60", false);
        let uri = entry.uri.clone();
        let result = can_reuse(
            &Method::GET,
            &uri,
            &HeaderMap::new(),
            &entry,
            &req_cc,
            &res_cc,
            10,
            Some(60),
        );
        assert_eq!(
            result,
            ReusabilityResult::Rejected(RejectReason::VaryStarNeverMatches)
        );
    }

    #[test]
    fn fresh_entry_is_reusable() {
        let entry = entry_with_vary(None);
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("max-age=60", false);
        let uri = entry.uri.clone();
        let result = can_reuse(
            &Method::GET,
            &uri,
            &HeaderMap::new(),
            &entry,
            &req_cc,
            &res_cc,
            10,
            Some(60),
        );
        assert_eq!(result, ReusabilityResult::Reusable);
    }

    #[test]
    fn stale_entry_requires_validation() {
        let entry = entry_with_vary(None);
        let req_cc = parse_cache_control("", true);
        let res_cc = parse_cache_control("max-age=60", false);
        let uri = entry.uri.clone();
        let result = can_reuse(
            &Method::GET,
            &uri,
            &HeaderMap::new(),
            &entry,
            &req_cc,
            &res_cc,
            600,
            Some(60),
        );
        assert_eq!(result, ReusabilityResult::RequiresValidation);
    }
}
