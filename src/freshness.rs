//! RFC 7234 age arithmetic and freshness-lifetime precedence chain.

use crate::config::CacheType;
use crate::entry::CacheEntry;
use crate::header::CacheControl;
use http::HeaderMap;
use time::OffsetDateTime;

const DEFAULT_HEURISTIC_SECONDS: u64 = 5 * 60;

/// Parse a header's value as an HTTP-date first (the wire-normative
/// form), falling back to RFC 3339. Resolves the Open Question on date
/// grammar in favor of accepting both.
pub fn parse_http_or_rfc3339_date(value: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = httpdate::parse_http_date(value) {
        return Some(OffsetDateTime::from(dt));
    }
    time::OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339).ok()
}

fn header_date(headers: &HeaderMap, name: &str) -> Option<OffsetDateTime> {
    headers.get(name).and_then(|v| v.to_str().ok()).and_then(parse_http_or_rfc3339_date)
}

fn age_header_seconds(headers: &HeaderMap) -> u64 {
    headers
        .get(http::header::AGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

fn saturating_seconds(dur: time::Duration) -> i64 {
    dur.whole_seconds()
}

/// The RFC 7234 §4.2.3 age algorithm, evaluated at `now`.
pub fn current_age(
    headers: &HeaderMap,
    request_time: OffsetDateTime,
    response_time: OffsetDateTime,
    now: OffsetDateTime,
) -> u64 {
    let date = header_date(headers, "date").unwrap_or(response_time);
    let apparent_age = saturating_seconds(response_time - date).max(0) as u64;
    let response_delay = saturating_seconds(response_time - request_time).max(0) as u64;
    let corrected_age_value = age_header_seconds(headers) + response_delay;
    let corrected_initial_age = apparent_age.max(corrected_age_value);
    let resident_time = saturating_seconds(now - response_time).max(0) as u64;
    corrected_initial_age + resident_time
}

/// Freshness lifetime in seconds, or `None` if the entry is never fresh
/// (no explicit expiration and heuristic freshness doesn't apply).
#[allow(clippy::too_many_arguments)]
pub fn freshness_lifetime(
    headers: &HeaderMap,
    response_cc: &CacheControl,
    status: http::StatusCode,
    cache_type: CacheType,
    enable_heuristic: bool,
    heuristic_percentage: f64,
    max_heuristic_duration: std::time::Duration,
) -> Option<u64> {
    if cache_type == CacheType::Shared {
        if let Some(s_maxage) = response_cc.s_maxage() {
            return Some(s_maxage);
        }
    }
    if let Some(max_age) = response_cc.max_age() {
        return Some(max_age);
    }
    if let Some(expires) = headers.get(http::header::EXPIRES).and_then(|v| v.to_str().ok()) {
        return match parse_http_or_rfc3339_date(expires) {
            Some(expires_at) => {
                let date = header_date(headers, "date").unwrap_or(expires_at);
                Some(saturating_seconds(expires_at - date).max(0) as u64)
            }
            None => Some(0),
        };
    }
    let heuristic_eligible = response_cc.public()
        || crate::header::is_heuristically_cacheable_status(status);
    if enable_heuristic
        && heuristic_eligible
        && !response_cc.no_cache()
        && !response_cc.no_store()
    {
        if let Some(last_modified) =
            headers.get(http::header::LAST_MODIFIED).and_then(|v| v.to_str().ok())
        {
            if let Some(lm) = parse_http_or_rfc3339_date(last_modified) {
                let date = header_date(headers, "date").unwrap_or_else(OffsetDateTime::now_utc);
                if lm <= date {
                    let age = saturating_seconds(date - lm).max(0) as u64;
                    let heuristic = (age as f64 * heuristic_percentage) as u64;
                    return Some(heuristic.min(max_heuristic_duration.as_secs()));
                }
            }
        }
        if crate::header::is_heuristically_cacheable_status(status) {
            return Some(DEFAULT_HEURISTIC_SECONDS);
        }
    }
    None
}

/// Freshness lifetime computed directly from a stored entry's headers,
/// using its own response directives; a convenience over
/// [`freshness_lifetime`] for callers that only have the entry.
pub fn entry_freshness_lifetime(
    entry: &CacheEntry,
    cache_type: CacheType,
    enable_heuristic: bool,
    heuristic_percentage: f64,
    max_heuristic_duration: std::time::Duration,
) -> Option<u64> {
    let cc = crate::header::parse_cache_control_header(&entry.headers, false);
    freshness_lifetime(
        &entry.headers,
        &cc,
        entry.status_code,
        cache_type,
        enable_heuristic,
        heuristic_percentage,
        max_heuristic_duration,
    )
}

/// Whether `age` is within `lifetime`; always `false` when there is no
/// freshness lifetime at all.
pub fn is_fresh(age: u64, lifetime: Option<u64>) -> bool {
    matches!(lifetime, Some(l) if age <= l)
}

/// Whether a response lacking `must-revalidate` (and, for shared caches,
/// `proxy-revalidate`) may still be served stale given the request's
/// `max-stale` directive or a disconnected caller.
pub fn allows_stale_serving(
    response_cc: &CacheControl,
    request_cc: &CacheControl,
    cache_type: CacheType,
    age: u64,
    lifetime: u64,
    caller_disconnected: bool,
) -> bool {
    if response_cc.must_revalidate() {
        return false;
    }
    if cache_type == CacheType::Shared && response_cc.proxy_revalidate() {
        return false;
    }
    if caller_disconnected {
        return true;
    }
    match request_cc.max_stale() {
        Some(None) => true,
        Some(Some(max_stale)) => age.saturating_sub(lifetime) <= max_stale,
        None => false,
    }
}

/// `min-fresh=Δ` requires `lifetime − age ≥ Δ`.
pub fn satisfies_min_fresh(request_cc: &CacheControl, age: u64, lifetime: u64) -> bool {
    match request_cc.min_fresh() {
        Some(min_fresh) => lifetime.saturating_sub(age) >= min_fresh,
        None => true,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::header::parse_cache_control;
    use http::HeaderValue;
    use time::Duration as TimeDuration;

    fn hdrs(date: OffsetDateTime) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            http::header::DATE,
            HeaderValue::from_str(&httpdate::fmt_http_date(date.into())).unwrap(),
        );
        h
    }

    #[test]
    fn age_is_zero_at_response_time() {
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let headers = hdrs(t0);
        let age = current_age(&headers, t0, t0, t0);
        assert_eq!(age, 0);
    }

    #[test]
    fn age_grows_monotonically_with_now() {
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let headers = hdrs(t0);
        let a1 = current_age(&headers, t0, t0, t0 + TimeDuration::seconds(30));
        let a2 = current_age(&headers, t0, t0, t0 + TimeDuration::seconds(600));
        assert_eq!(a1, 30);
        assert!(a2 > a1);
    }

    #[test]
    fn freshness_lifetime_prefers_s_maxage_for_shared() {
        let cc = parse_cache_control("max-age=60, s-maxage=300", false);
        let headers = HeaderMap::new();
        let lifetime = freshness_lifetime(
            &headers,
            &cc,
            http::StatusCode::OK,
            CacheType::Shared,
            true,
            0.1,
            std::time::Duration::from_secs(7 * 24 * 3600),
        );
        assert_eq!(lifetime, Some(300));
    }

    #[test]
    fn freshness_lifetime_falls_back_to_max_age_for_private() {
        let cc = parse_cache_control("max-age=60, s-maxage=300", false);
        let headers = HeaderMap::new();
        let lifetime = freshness_lifetime(
            &headers,
            &cc,
            http::StatusCode::OK,
            CacheType::Private,
            true,
            0.1,
            std::time::Duration::from_secs(7 * 24 * 3600),
        );
        assert_eq!(lifetime, Some(60));
    }

    #[test]
    fn no_explicit_or_heuristic_freshness_is_none() {
        let cc = parse_cache_control("no-cache", false);
        let headers = HeaderMap::new();
        let lifetime = freshness_lifetime(
            &headers,
            &cc,
            http::StatusCode::OK,
            CacheType::Private,
            true,
            0.1,
            std::time::Duration::from_secs(7 * 24 * 3600),
        );
        assert_eq!(lifetime, None);
    }

    #[test]
    fn min_fresh_requires_enough_remaining_lifetime() {
        let cc = parse_cache_control("min-fresh=10", true);
        assert!(satisfies_min_fresh(&cc, 50, 70));
        assert!(!satisfies_min_fresh(&cc, 65, 70));
    }
}
