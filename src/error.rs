use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with the [`CacheError`] type
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced across the engine boundary.
///
/// Only failures that §7 of the design marks "Propagated: yes" get a
/// variant here; storability/reusability rejections, size-exceeded puts,
/// and validation mismatches are ordinary return values, not errors.
#[derive(Error, Diagnostic, Debug)]
pub enum CacheError {
    /// A general error used as a catch-all for backend failures via anyhow
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::general))]
    General(#[from] anyhow::Error),
    /// Error from the durable tier's underlying content store
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::cacache))]
    CaCache(#[from] cacache::Error),
    /// Error (de)serializing a stored entry or index row
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::serialize))]
    Serialize(#[from] postcard::Error),
    /// Local filesystem failure underneath the durable tier
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::io))]
    Io(#[from] std::io::Error),
    /// Error from http
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::http))]
    Http(#[from] http::Error),
    /// There was an error parsing the HTTP status code
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::invalid_status_code))]
    InvalidStatusCode(#[from] http::status::InvalidStatusCode),
    /// There was an error converting a header value to a string
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::header_to_str))]
    HeaderToStr(#[from] http::header::ToStrError),
    /// There was an error parsing the HTTP method
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::invalid_method))]
    InvalidMethod(#[from] http::method::InvalidMethod),
    /// There was an error parsing the URI
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::invalid_uri))]
    InvalidUri(#[from] http::uri::InvalidUri),
    /// There was an error parsing an HTTP header value
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::invalid_header_value))]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    /// There was an error parsing an HTTP header name
    #[error(transparent)]
    #[diagnostic(code(http_cache_engine::invalid_header_name))]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
}
