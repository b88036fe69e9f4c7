#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
#![allow(clippy::doc_lazy_continuation)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! An HTTP response caching engine implementing RFC 7234 semantics over a
//! tiered store.
//!
//! This crate is the caching engine itself, not a client or server
//! middleware: it decides whether a response may be stored, whether a
//! stored response may be reused, how old a stored response is, and when
//! an unsafe method should invalidate what it stored. Wiring it into a
//! particular HTTP client or server is left to an adapter built on top
//! of [`engine::Engine`].
//!
//! ## Basic usage
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), http_cache_engine::error::CacheError> {
//! use http_cache_engine::config::CacheEngineConfig;
//! use http_cache_engine::engine::Engine;
//!
//! let config = CacheEngineConfig::new().with_database_path("./cache");
//! let engine = Engine::new(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`header`] - `Cache-Control` parsing and header classification tables.
//! - [`key`] - cache key derivation, including `Vary` fan-out.
//! - [`freshness`] - the age algorithm and freshness-lifetime precedence.
//! - [`decider`] - the storability and reusability gates.
//! - [`validator`] - conditional-request headers and 304/HEAD-freshening merges.
//! - [`invalidator`] - unsafe-method cache invalidation.
//! - [`entry`] - the stored response type and its associated value types.
//! - [`store`] - the storage contract and its volatile/durable/tiered implementations.
//! - [`config`] - engine-wide configuration.
//! - [`engine`] - the facade tying all of the above together.

pub mod config;
pub mod decider;
pub mod engine;
pub mod entry;
pub mod error;
pub mod freshness;
pub mod header;
pub mod invalidator;
pub mod key;
pub mod store;
pub mod validator;

pub use config::{CacheEngineConfig, CacheIntent, CacheType, EvictionStrategy};
pub use engine::{CacheRequest, CacheResponse, CacheStats, Engine};
pub use entry::{
    CacheEntry, CachedResponse, RejectReason, ReusabilityResult, StorabilityResult,
};
pub use error::{CacheError, Result};
