//! Black-box coverage of the engine facade's public API: the end-to-end
//! scenarios and the quantified invariants, exercised through `Engine`
//! rather than the individual component modules (which have their own
//! focused unit tests alongside their implementations).

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use http_cache_engine::config::{CacheEngineConfig, CacheIntent};
use http_cache_engine::engine::Engine;
use time::OffsetDateTime;

fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut h = HeaderMap::new();
    for (k, v) in pairs {
        h.insert(
            http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
            HeaderValue::from_str(v).unwrap(),
        );
    }
    h
}

async fn engine(dir: &std::path::Path) -> Engine {
    let config = CacheEngineConfig::new()
        .with_database_path(dir)
        .with_max_memory_entries(100)
        .with_max_disk_entries(100);
    Engine::new(config).await.unwrap()
}

/// S2 (stale with revalidation): a stored response ages past its
/// `max-age`, the first read reports `isStale`/`requiresValidation`, and
/// a subsequent `updateFrom304` with matching validators makes the next
/// read fresh again.
#[tokio::test]
async fn s2_stale_with_revalidation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let uri: Uri = "https://example.com/a".parse().unwrap();

    // Backdate request/response times by 10 minutes so the entry is
    // already well past its 300s max-age by the time we read it, without
    // depending on a real sleep.
    let response_time = OffsetDateTime::now_utc() - time::Duration::seconds(600);
    let response_headers = headers(&[
        ("cache-control", "max-age=300"),
        ("date", &httpdate::fmt_http_date(response_time.into())),
        ("etag", "\"v1\""),
    ]);
    engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &response_headers,
            Bytes::from_static(b"body"),
            response_time,
            response_time,
            None,
        )
        .await
        .unwrap();

    let first_read =
        engine.get(&Method::GET, &uri, &HeaderMap::new(), CacheIntent::Standard, None).await.unwrap();
    let first_read = first_read.expect("stale entry is still a hit, just one requiring validation");
    assert!(first_read.is_stale);
    assert!(first_read.requires_validation);
    assert!(first_read.age >= 600);

    let validation_response_time = OffsetDateTime::now_utc();
    let validation_headers = headers(&[
        ("cache-control", "max-age=300"),
        ("date", &httpdate::fmt_http_date(validation_response_time.into())),
        ("etag", "\"v1\""),
    ]);
    let updated = engine
        .update_from_304(
            &Method::GET,
            &uri,
            &validation_headers,
            validation_response_time,
            validation_response_time,
            None,
        )
        .await
        .unwrap();
    assert!(updated.is_some());

    let second_read =
        engine.get(&Method::GET, &uri, &HeaderMap::new(), CacheIntent::Standard, None).await.unwrap();
    let second_read = second_read.unwrap();
    assert!(!second_read.is_stale);
    assert!(!second_read.requires_validation);
    assert_eq!(second_read.entry.body, b"body".to_vec());
}

/// Invariant 1: `no-store` on either side of the exchange always rejects
/// storage, regardless of every other directive present.
#[tokio::test]
async fn invariant_no_store_always_rejects_storage() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let uri: Uri = "https://example.com/a".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();

    let request_side = engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &headers(&[("cache-control", "no-store")]),
            &headers(&[("cache-control", "max-age=300")]),
            Bytes::from_static(b"x"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();
    assert!(!request_side);

    let response_side = engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &headers(&[("cache-control", "max-age=300, no-store")]),
            Bytes::from_static(b"x"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();
    assert!(!response_side);
}

/// Invariant 2: a `private` response is never storable in a shared cache.
#[tokio::test]
async fn invariant_private_response_rejected_in_shared_cache() {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheEngineConfig::new()
        .with_database_path(dir.path())
        .with_cache_type(http_cache_engine::config::CacheType::Shared);
    let engine = Engine::new(config).await.unwrap();
    let uri: Uri = "https://example.com/a".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();

    let stored = engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &headers(&[("cache-control", "private, max-age=300")]),
            Bytes::from_static(b"x"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();
    assert!(!stored);
}

/// Invariant 3: a mismatched URI or an unsafe storage method never
/// reuses a stored entry.
#[tokio::test]
async fn invariant_mismatched_uri_or_method_never_reuses() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let stored_uri: Uri = "https://example.com/a".parse().unwrap();
    let other_uri: Uri = "https://example.com/b".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();
    engine
        .put(
            &Method::GET,
            &stored_uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &headers(&[("cache-control", "max-age=300")]),
            Bytes::from_static(b"x"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();

    assert!(engine
        .get(&Method::GET, &other_uri, &HeaderMap::new(), CacheIntent::Standard, None)
        .await
        .unwrap()
        .is_none());

    // POST is never safe-reusable even against the stored entry's own URI:
    // it looks up under its own primary key (distinct from the GET's),
    // so it is a plain miss here too.
    assert!(engine
        .get(&Method::POST, &stored_uri, &HeaderMap::new(), CacheIntent::Standard, None)
        .await
        .unwrap()
        .is_none());
}

/// Invariant 4: `updateFrom304` with matching validators preserves the
/// body and replaces only the merged header set.
#[tokio::test]
async fn invariant_update_from_304_merges_headers_only() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let uri: Uri = "https://example.com/a".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();
    engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &headers(&[
                ("cache-control", "max-age=300"),
                ("etag", "\"v1\""),
                ("content-type", "text/plain"),
            ]),
            Bytes::from_static(b"unchanged"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();

    let t1 = t0 + time::Duration::seconds(120);
    let updated = engine
        .update_from_304(
            &Method::GET,
            &uri,
            &headers(&[("cache-control", "max-age=60"), ("etag", "\"v1\"")]),
            t1,
            t1,
            None,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.body, b"unchanged".to_vec());
    assert_eq!(updated.headers.get(http::header::CACHE_CONTROL).unwrap(), "max-age=60");
    // content-type is not in the merged set, so it survives untouched.
    assert_eq!(updated.headers.get(http::header::CONTENT_TYPE).unwrap(), "text/plain");
}

/// Invariant 6: a `Vary: *` entry can never be reused by any request.
#[tokio::test]
async fn invariant_vary_star_never_reused() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let uri: Uri = "https://example.com/a".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();
    engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &headers(&[("cache-control", "max-age=300"), ("vary", "*")]),
            Bytes::from_static(b"x"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();

    assert!(engine
        .get(&Method::GET, &uri, &HeaderMap::new(), CacheIntent::Standard, None)
        .await
        .unwrap()
        .is_none());
}

/// Invariant 8: after an unsafe-method invalidation, every subsequent
/// read is a miss until a new `put` occurs.
#[tokio::test]
async fn invariant_invalidation_is_observed_until_next_put() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path()).await;
    let uri: Uri = "https://example.com/a".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();
    engine
        .put(
            &Method::GET,
            &uri,
            StatusCode::OK,
            &HeaderMap::new(),
            &headers(&[("cache-control", "max-age=300")]),
            Bytes::from_static(b"x"),
            t0,
            t0,
            None,
        )
        .await
        .unwrap();

    engine
        .invalidate_on_unsafe_method(&Method::PUT, &uri, StatusCode::OK, &HeaderMap::new())
        .await
        .unwrap();

    for _ in 0..3 {
        assert!(engine
            .get(&Method::GET, &uri, &HeaderMap::new(), CacheIntent::Standard, None)
            .await
            .unwrap()
            .is_none());
    }
}

/// Invariant 9: a stored entry round-trips through the durable tier's
/// postcard encoding byte-exactly, including its `Vary` mapping.
#[tokio::test]
async fn invariant_durable_round_trip_preserves_vary_and_body() {
    let dir = tempfile::tempdir().unwrap();
    let uri: Uri = "https://example.com/a".parse().unwrap();
    let t0 = OffsetDateTime::now_utc();
    let request_headers = headers(&[("accept-language", "en")]);
    let response_headers =
        headers(&[("cache-control", "max-age=300"), ("vary", "Accept-Language")]);

    {
        let engine = engine(dir.path()).await;
        engine
            .put(
                &Method::GET,
                &uri,
                StatusCode::OK,
                &request_headers,
                &response_headers,
                Bytes::from_static(&[9, 8, 7]),
                t0,
                t0,
                None,
            )
            .await
            .unwrap();
        engine.close().await.unwrap();
    }

    // A fresh engine over the same database path must see the entry
    // exactly as stored, proving the durable tier's index/content survive
    // a process boundary.
    let reopened = engine(dir.path()).await;
    let result = reopened
        .get(&Method::GET, &uri, &request_headers, CacheIntent::Standard, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.entry.body, vec![9, 8, 7]);
    assert!(!result.requires_validation);
}
