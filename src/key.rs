//! Deterministic cache-key derivation: primary keys, `Vary`-qualified
//! keys, and optional double-keying for cross-site partitioning.

use http::{HeaderMap, Method, Uri};

/// Suffix appended to a primary key when the stored response carried
/// `Vary: *`. Never produced by a request-side lookup, so such an entry
/// can never be matched again; it is reachable only for cleanup.
const VARY_STAR_SENTINEL: &str = "vary:*";

// `http::Uri` has no fragment component (it's stripped at parse time),
// so `uri.to_string()` is already fragment-free.
fn uri_without_fragment(uri: &Uri) -> String {
    uri.to_string()
}

fn hash_to_hex(input: &str) -> String {
    hex::encode(blake3::hash(input.as_bytes()).as_bytes())
}

/// `hash("METHOD:uri-without-fragment")`, optionally prefixed by a
/// caller-supplied site identifier when double-keying is enabled.
pub fn primary_key(method: &Method, uri: &Uri, site_prefix: Option<&str>) -> String {
    let base = format!("{}:{}", method.as_str().to_ascii_uppercase(), uri_without_fragment(uri));
    match site_prefix {
        Some(prefix) => hash_to_hex(&format!("{prefix}|{base}")),
        None => hash_to_hex(&base),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the `Vary`-qualified key from a response's `Vary` header and the
/// request headers present at storage time. Returns the primary key
/// unchanged when `Vary` is absent or empty, and the star sentinel when
/// `Vary: *` was sent.
pub fn vary_qualified_key(
    primary: &str,
    vary_header: Option<&str>,
    request_headers: &HeaderMap,
) -> String {
    let Some(vary_value) = vary_header else {
        return primary.to_string();
    };
    let fields: Vec<&str> = vary_value.split(',').map(str::trim).filter(|f| !f.is_empty()).collect();
    if fields.is_empty() {
        return primary.to_string();
    }
    if fields.iter().any(|f| *f == "*") {
        return hash_to_hex(&format!("{primary}|{VARY_STAR_SENTINEL}"));
    }
    let mut pairs: Vec<(String, String)> = fields
        .iter()
        .map(|f| {
            let name = f.to_ascii_lowercase();
            let value = request_headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(collapse_whitespace)
                .unwrap_or_default();
            (name, value)
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let serialized =
        pairs.into_iter().map(|(k, v)| format!("{k}:{v}")).collect::<Vec<_>>().join("|");
    hash_to_hex(&format!("{primary}|vary:{serialized}"))
}

/// Extract the exact request values the response's `Vary` nominates, for
/// storage alongside the entry (so a later lookup can re-derive whether
/// the stored response still matches). Mirrors the normalization in
/// [`vary_qualified_key`].
pub fn extract_vary_headers(
    vary_header: Option<&str>,
    request_headers: &HeaderMap,
) -> Option<std::collections::BTreeMap<String, String>> {
    let vary_value = vary_header?;
    let fields: Vec<&str> = vary_value.split(',').map(str::trim).filter(|f| !f.is_empty()).collect();
    if fields.is_empty() {
        return None;
    }
    if fields.iter().any(|f| *f == "*") {
        let mut m = std::collections::BTreeMap::new();
        m.insert("*".to_string(), "*".to_string());
        return Some(m);
    }
    let mut map = std::collections::BTreeMap::new();
    for f in fields {
        let name = f.to_ascii_lowercase();
        let value = request_headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(collapse_whitespace)
            .unwrap_or_default();
        map.insert(name, value);
    }
    Some(map)
}

/// Does the stored `varyHeaders` mapping still match the current request?
/// `*` (the sentinel) never matches. Absent stored mapping (no `Vary` on
/// the original response) always matches.
pub fn vary_matches(
    stored: &Option<std::collections::BTreeMap<String, String>>,
    request_headers: &HeaderMap,
) -> bool {
    let Some(stored) = stored else {
        return true;
    };
    if stored.contains_key("*") {
        return false;
    }
    stored.iter().all(|(name, stored_value)| {
        let current = request_headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(collapse_whitespace)
            .unwrap_or_default();
        &current == stored_value
    })
}
