//! Conditional-request header generation, 304 matching, and the
//! header-merge rules that follow a successful validation.

use crate::entry::CacheEntry;
use http::HeaderMap;
use time::OffsetDateTime;

/// Headers merged from a 304 (or a freshening HEAD) onto the stored
/// entry, replacing prior values by case-insensitive name.
const MERGED_ON_VALIDATION: [&str; 6] =
    ["cache-control", "date", "etag", "expires", "vary", "warning"];

/// Build conditional request headers (`If-None-Match`/`If-Modified-Since`)
/// from a stored entry's validators, layered onto the caller's existing
/// request headers.
pub fn conditional_request_headers(base: &HeaderMap, entry: &CacheEntry) -> HeaderMap {
    let mut headers = base.clone();
    if let Some(etag) = entry.headers.get(http::header::ETAG) {
        headers.insert(http::header::IF_NONE_MATCH, etag.clone());
    }
    if let Some(last_modified) = entry.headers.get(http::header::LAST_MODIFIED) {
        headers.insert(http::header::IF_MODIFIED_SINCE, last_modified.clone());
    }
    headers
}

fn strip_weak_prefix(value: &str) -> &str {
    value.strip_prefix("W/").unwrap_or(value)
}

/// Whether a 304's validators match the stored entry's, per §4.5: strong
/// ETag match first, then weak Last-Modified match, then "neither side
/// has a validator" as a conservative accept.
pub fn validators_match(entry: &CacheEntry, response_304_headers: &HeaderMap) -> bool {
    let stored_etag = entry.headers.get(http::header::ETAG).and_then(|v| v.to_str().ok());
    let received_etag =
        response_304_headers.get(http::header::ETAG).and_then(|v| v.to_str().ok());
    if let (Some(stored), Some(received)) = (stored_etag, received_etag) {
        return stored == received;
    }

    let stored_lm =
        entry.headers.get(http::header::LAST_MODIFIED).and_then(|v| v.to_str().ok());
    let received_lm =
        response_304_headers.get(http::header::LAST_MODIFIED).and_then(|v| v.to_str().ok());
    if let (Some(stored), Some(received)) = (stored_lm, received_lm) {
        return strip_weak_prefix(stored) == strip_weak_prefix(received);
    }

    stored_etag.is_none() && received_etag.is_none() && stored_lm.is_none() && received_lm.is_none()
}

/// Merge the defined header set from a validation response onto a copy
/// of the stored entry's headers.
fn merge_headers(stored: &HeaderMap, incoming: &HeaderMap) -> HeaderMap {
    let mut merged = stored.clone();
    for name in MERGED_ON_VALIDATION {
        merged.remove(name);
        let header_name = http::header::HeaderName::from_static(name);
        for value in incoming.get_all(name).iter() {
            merged.append(header_name.clone(), value.clone());
        }
    }
    merged
}

/// Produce a new entry from a 304: headers merged per §4.5, body/method/
/// uri/status untouched, times set to the validation round's times.
pub fn update_from_304(
    entry: &CacheEntry,
    response_304_headers: &HeaderMap,
    request_time: OffsetDateTime,
    response_time: OffsetDateTime,
) -> CacheEntry {
    CacheEntry {
        method: entry.method.clone(),
        uri: entry.uri.clone(),
        status_code: entry.status_code,
        headers: merge_headers(&entry.headers, response_304_headers),
        body: entry.body.clone(),
        request_time,
        response_time,
        vary_headers: entry.vary_headers.clone(),
        is_incomplete: entry.is_incomplete,
        content_range: entry.content_range.clone(),
        is_invalid: false,
    }
}

/// Optional HEAD-based freshening (Open Question 2, resolved as an
/// explicit opt-in distinct from `update_from_304`): a HEAD response
/// whose validators match and whose `Content-Length` (when present on
/// both sides) agrees may update the stored entry's headers; the body
/// is never touched.
pub fn freshen_from_head(
    entry: &CacheEntry,
    head_response_headers: &HeaderMap,
    request_time: OffsetDateTime,
    response_time: OffsetDateTime,
) -> Option<CacheEntry> {
    if !validators_match(entry, head_response_headers) {
        return None;
    }
    let stored_len = entry.headers.get(http::header::CONTENT_LENGTH).and_then(|v| v.to_str().ok());
    let head_len =
        head_response_headers.get(http::header::CONTENT_LENGTH).and_then(|v| v.to_str().ok());
    if let (Some(a), Some(b)) = (stored_len, head_len) {
        if a != b {
            return None;
        }
    }
    Some(update_from_304(entry, head_response_headers, request_time, response_time))
}
