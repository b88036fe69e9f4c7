//! Unsafe-method invalidation: the target URI plus same-origin
//! `Location`/`Content-Location` purge, and a best-effort `Vary`-probe
//! sweep.

use crate::key;
use http::{HeaderMap, Method, Uri};

/// Headers commonly used to nominate `Vary` fan-out; probed best-effort
/// on invalidation since the full set of request values that produced
/// Vary-qualified keys isn't recoverable without a storage scan.
const VARY_PROBE_HEADERS: [&str; 3] = ["accept", "accept-encoding", "accept-language"];

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Same scheme, host, and (normalized) port.
pub fn is_same_origin(target: &Uri, candidate: &Uri) -> bool {
    let (Some(t_scheme), Some(c_scheme)) = (target.scheme_str(), candidate.scheme_str()) else {
        return false;
    };
    if !t_scheme.eq_ignore_ascii_case(c_scheme) {
        return false;
    }
    let (Some(t_host), Some(c_host)) = (target.host(), candidate.host()) else {
        return false;
    };
    if !t_host.eq_ignore_ascii_case(c_host) {
        return false;
    }
    let t_port = target.port_u16().or_else(|| default_port(t_scheme));
    let c_port = candidate.port_u16().or_else(|| default_port(c_scheme));
    t_port == c_port
}

/// Resolve a `Location`/`Content-Location` header value against the
/// target URI. Relative references are resolved against the target's
/// scheme/authority only (path-relative resolution is out of scope;
/// adapters that need it reconstruct absolute URIs before calling in).
fn resolve_against(target: &Uri, location: &str) -> Option<Uri> {
    let parsed: Uri = location.parse().ok()?;
    if parsed.scheme().is_some() {
        return Some(parsed);
    }
    let mut parts = parsed.into_parts();
    parts.scheme = target.scheme().cloned();
    parts.authority = target.authority().cloned();
    Uri::from_parts(parts).ok()
}

/// The set of primary keys to purge for one unsafe-method invalidation,
/// per §4.6. Does not itself touch storage; the caller (the engine
/// facade) performs the actual `remove`/`clear_where` calls so that this
/// function stays storage-agnostic and trivially testable.
pub fn keys_to_invalidate(
    method: &Method,
    target_uri: &Uri,
    status: http::StatusCode,
    response_headers: &HeaderMap,
) -> Vec<String> {
    if !crate::header::is_unsafe_invalidating_method(method)
        || !(200..400).contains(&status.as_u16())
    {
        return Vec::new();
    }

    let mut keys = Vec::new();
    for safe_method in [Method::GET, Method::HEAD] {
        keys.push(key::primary_key(&safe_method, target_uri, None));
    }

    for header_name in [http::header::LOCATION, http::header::CONTENT_LOCATION] {
        if let Some(value) = response_headers.get(header_name).and_then(|v| v.to_str().ok()) {
            if let Some(resolved) = resolve_against(target_uri, value) {
                if is_same_origin(target_uri, &resolved) {
                    for safe_method in [Method::GET, Method::HEAD] {
                        keys.push(key::primary_key(&safe_method, &resolved, None));
                    }
                }
            }
        }
    }

    for probe in VARY_PROBE_HEADERS {
        let mut probe_headers = HeaderMap::new();
        probe_headers.insert(
            http::HeaderName::from_static(probe),
            http::HeaderValue::from_static("*"),
        );
        let probe_key = key::vary_qualified_key(
            &key::primary_key(&Method::GET, target_uri, None),
            Some(probe),
            &probe_headers,
        );
        keys.push(probe_key);
    }

    keys
}

#[cfg(test)]
mod test {
    use super::*;
    use http::{HeaderValue, StatusCode};

    #[test]
    fn safe_methods_never_invalidate() {
        let uri: Uri = "https://example.com/a".parse().unwrap();
        let keys = keys_to_invalidate(&Method::GET, &uri, StatusCode::OK, &HeaderMap::new());
        assert!(keys.is_empty());
    }

    #[test]
    fn unsafe_method_with_error_status_does_not_invalidate() {
        let uri: Uri = "https://example.com/a".parse().unwrap();
        let keys =
            keys_to_invalidate(&Method::POST, &uri, StatusCode::INTERNAL_SERVER_ERROR, &HeaderMap::new());
        assert!(keys.is_empty());
    }

    #[test]
    fn unsafe_method_with_success_invalidates_target() {
        let uri: Uri = "https://example.com/a".parse().unwrap();
        let keys = keys_to_invalidate(&Method::PUT, &uri, StatusCode::OK, &HeaderMap::new());
        assert!(keys.contains(&key::primary_key(&Method::GET, &uri, None)));
    }

    #[test]
    fn same_origin_location_is_invalidated() {
        let target: Uri = "https://example.com/a".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::LOCATION,
            HeaderValue::from_static("https://example.com/b"),
        );
        let keys = keys_to_invalidate(&Method::POST, &target, StatusCode::CREATED, &headers);
        let b: Uri = "https://example.com/b".parse().unwrap();
        assert!(keys.contains(&key::primary_key(&Method::GET, &b, None)));
    }

    #[test]
    fn cross_origin_location_is_not_invalidated() {
        let target: Uri = "https://example.com/a".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::LOCATION,
            HeaderValue::from_static("https://evil.example/b"),
        );
        let keys = keys_to_invalidate(&Method::POST, &target, StatusCode::CREATED, &headers);
        let evil: Uri = "https://evil.example/b".parse().unwrap();
        assert!(!keys.contains(&key::primary_key(&Method::GET, &evil, None)));
    }

    #[test]
    fn same_origin_ignores_default_port_vs_explicit() {
        let a: Uri = "https://example.com/a".parse().unwrap();
        let b: Uri = "https://example.com:443/a".parse().unwrap();
        assert!(is_same_origin(&a, &b));
    }
}
