//! Cache-Control tokenizing, header classification tables, and the
//! case-insensitive lookups the rest of the engine builds on.
//!
//! The tokenizer is the explicit two-state machine design notes call for:
//! `Outside` a quoted string or `InsideQuotes`, split on commas that live in
//! the `Outside` state only.

use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::collections::HashMap;

/// Safe-reusable methods: only these may match a stored entry on read.
pub const SAFE_REUSABLE_METHODS: [&str; 2] = ["GET", "HEAD"];
/// Cacheable methods: only these may be stored at all.
pub const CACHEABLE_METHODS: [&str; 3] = ["GET", "HEAD", "POST"];
/// Unsafe methods that trigger invalidation on a successful response.
pub const UNSAFE_INVALIDATING_METHODS: [&str; 4] = ["POST", "PUT", "DELETE", "PATCH"];

/// Statuses eligible for heuristic freshness (and, by the same table, for
/// the storability "storage indicator" fallback).
pub const HEURISTICALLY_CACHEABLE_STATUSES: [u16; 12] =
    [200, 203, 204, 206, 300, 301, 304, 404, 405, 410, 414, 501];

/// Stripped unconditionally before storage; never round-tripped.
pub const PROHIBITED_STORED_HEADERS: [&str; 4] = [
    "connection",
    "proxy-authentication-info",
    "proxy-authorization",
    "proxy-authenticate",
];

/// Stripped in addition to the above when preparing a response for reuse.
pub const HOP_BY_HOP_HEADERS: [&str; 6] =
    ["keep-alive", "te", "trailer", "transfer-encoding", "upgrade", "connection"];

/// Whether `method` may be served from a stored entry on read.
pub fn is_safe_reusable_method(method: &Method) -> bool {
    SAFE_REUSABLE_METHODS.iter().any(|m| method.as_str().eq_ignore_ascii_case(m))
}

/// Whether `method` may have its response stored at all.
pub fn is_cacheable_method(method: &Method) -> bool {
    CACHEABLE_METHODS.iter().any(|m| method.as_str().eq_ignore_ascii_case(m))
}

/// Whether a successful response to `method` invalidates stored entries
/// for the same URI.
pub fn is_unsafe_invalidating_method(method: &Method) -> bool {
    UNSAFE_INVALIDATING_METHODS.iter().any(|m| method.as_str().eq_ignore_ascii_case(m))
}

/// Whether `status` is eligible for heuristic freshness.
pub fn is_heuristically_cacheable_status(status: StatusCode) -> bool {
    HEURISTICALLY_CACHEABLE_STATUSES.contains(&status.as_u16())
}

/// "Final" means a complete response, never an interim 1xx.
pub fn is_final_status(status: StatusCode) -> bool {
    status.as_u16() >= 200
}

/// Remove headers that must never be persisted, case-insensitively.
pub fn strip_prohibited_headers(headers: &mut HeaderMap) {
    for name in PROHIBITED_STORED_HEADERS {
        headers.remove(name);
    }
}

/// Remove hop-by-hop headers (superset of [`strip_prohibited_headers`])
/// when handing a reused response back out.
pub fn strip_hop_by_hop_headers(headers: &mut HeaderMap) {
    strip_prohibited_headers(headers);
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// One parsed `Cache-Control` header. `extensions` retains any directive
/// not in the recognized set (value `None` if bare).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheControl {
    is_request: bool,
    directives: HashMap<String, Option<String>>,
}

impl CacheControl {
    /// An empty directive set, used when no `Cache-Control` header is
    /// present or it isn't valid UTF-8.
    pub fn empty(is_request: bool) -> Self {
        Self { is_request, directives: HashMap::new() }
    }

    /// Whether this directive set was parsed from a request (as opposed
    /// to a response) header.
    pub fn is_request(&self) -> bool {
        self.is_request
    }

    fn get(&self, name: &str) -> Option<&Option<String>> {
        self.directives.get(name)
    }

    /// Whether the named directive is present, bare or with a value.
    pub fn has(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    fn duration_directive(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(Some(v)) => v.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    /// The `max-age` directive's value in seconds, if present and numeric.
    pub fn max_age(&self) -> Option<u64> {
        self.duration_directive("max-age")
    }

    /// The `s-maxage` directive's value in seconds, if present and
    /// numeric.
    pub fn s_maxage(&self) -> Option<u64> {
        self.duration_directive("s-maxage")
    }

    /// Whether `no-store` is present.
    pub fn no_store(&self) -> bool {
        self.has("no-store")
    }

    /// `no-cache` with no field list is a bare no-cache; `no-cache="f1,f2"`
    /// only forbids reuse of those fields without revalidation, but this
    /// engine treats either form as "requires validation" wholesale. The
    /// finer per-field distinction is not exercised by the spec's testable
    /// properties.
    pub fn no_cache(&self) -> bool {
        self.has("no-cache")
    }

    /// Whether `no-transform` is present.
    pub fn no_transform(&self) -> bool {
        self.has("no-transform")
    }

    /// Whether `must-revalidate` is present.
    pub fn must_revalidate(&self) -> bool {
        self.has("must-revalidate")
    }

    /// Whether `must-understand` is present.
    pub fn must_understand(&self) -> bool {
        self.has("must-understand")
    }

    /// Whether `proxy-revalidate` is present.
    pub fn proxy_revalidate(&self) -> bool {
        self.has("proxy-revalidate")
    }

    /// Whether `public` is present.
    pub fn public(&self) -> bool {
        self.has("public")
    }

    /// Whether `private` is present.
    pub fn private(&self) -> bool {
        self.has("private")
    }

    /// Whether `only-if-cached` is present.
    pub fn only_if_cached(&self) -> bool {
        self.has("only-if-cached")
    }

    /// `max-stale` with no value means "unlimited staleness accepted".
    pub fn max_stale(&self) -> Option<Option<u64>> {
        self.get("max-stale").map(|v| v.as_ref().and_then(|s| s.trim().parse::<u64>().ok()))
    }

    /// The `min-fresh` directive's value in seconds, if present and
    /// numeric.
    pub fn min_fresh(&self) -> Option<u64> {
        self.duration_directive("min-fresh")
    }

    /// The value of a directive not in the recognized set, or `None` if
    /// `name` is itself a recognized directive (use its dedicated
    /// accessor instead).
    pub fn extension(&self, name: &str) -> Option<&Option<String>> {
        if RECOGNIZED_DIRECTIVES.contains(&name) {
            None
        } else {
            self.get(name)
        }
    }
}

const RECOGNIZED_DIRECTIVES: [&str; 15] = [
    "max-age",
    "s-maxage",
    "no-cache",
    "no-store",
    "no-transform",
    "must-revalidate",
    "must-understand",
    "proxy-revalidate",
    "public",
    "private",
    "max-stale",
    "min-fresh",
    "only-if-cached",
    "immutable",
    "stale-while-revalidate",
];

#[derive(PartialEq)]
enum TokenizerState {
    Outside,
    InsideQuotes,
}

/// Split a `Cache-Control` value into raw `name[=value]` tokens, honoring
/// quoted commas.
fn tokenize(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = TokenizerState::Outside;
    for ch in value.chars() {
        match state {
            TokenizerState::Outside => match ch {
                ',' => {
                    tokens.push(std::mem::take(&mut current));
                }
                '"' => {
                    state = TokenizerState::InsideQuotes;
                    current.push(ch);
                }
                _ => current.push(ch),
            },
            TokenizerState::InsideQuotes => {
                if ch == '"' {
                    state = TokenizerState::Outside;
                }
                current.push(ch);
            }
        }
    }
    tokens.push(current);
    tokens
}

/// Parse a `Cache-Control` header value. A header value that isn't valid
/// UTF-8 is handled by the caller (degrades to "no directives parsed");
/// this function only ever sees `&str`.
pub fn parse_cache_control(value: &str, is_request: bool) -> CacheControl {
    let mut directives = HashMap::new();
    for raw in tokenize(value) {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }
        let (name, val) = match token.split_once('=') {
            Some((n, v)) => {
                let v = v.trim();
                let v = v.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(v);
                (n.trim(), Some(v.to_string()))
            }
            None => (token, None),
        };
        directives.insert(name.to_ascii_lowercase(), val);
    }
    CacheControl { is_request, directives }
}

/// Parse the `Cache-Control` header out of a [`HeaderMap`], defaulting to
/// an empty directive set (no header, or a non-UTF-8 value) per §7.
pub fn parse_cache_control_header(headers: &HeaderMap, is_request: bool) -> CacheControl {
    match headers.get(http::header::CACHE_CONTROL).and_then(|v| v.to_str().ok()) {
        Some(value) => parse_cache_control(value, is_request),
        None => CacheControl::empty(is_request),
    }
}

/// Case-insensitive single-value lookup, returning the borrowed string
/// slice. Multiple same-named headers are not comma-joined here; that
/// join only matters for `Vary`-matching (see `key.rs`), where it's done
/// explicitly against `get_all`.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Whether `name` is present in `headers`, regardless of value.
pub fn has_header(headers: &HeaderMap, name: &str) -> bool {
    headers.contains_key(name)
}

/// Comma-join all values for a header name, matching the "multiple values
/// represented by their comma-joined concatenation" rule in §6.
pub fn header_str_joined(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let mut values = headers.get_all(name).iter().filter_map(|v| v.to_str().ok()).peekable();
    values.peek()?;
    Some(values.collect::<Vec<_>>().join(", "))
}

/// Parse a string into a [`HeaderValue`], discarding the error on failure.
pub fn header_value(s: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(s).ok()
}
