//! Fetch orchestration: HTTP GET with cache lookup and stale fallback
//!
//! `fetch` resolves a URL to response data through the TTL cache: a live
//! cached value short-circuits the network entirely, a miss or expired
//! entry triggers a GET, and a failed GET falls back to the last cached
//! value even when that value is stale. The call only fails when argument
//! validation fails or when the network fails and nothing was ever cached
//! for the derived key.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{GetOptions, SetOptions, TtlCache};
use crate::http::{HttpClient, HttpError};
use crate::store::StoreError;

/// Response transformation applied before the result is cached or returned
pub type Transform = Box<dyn Fn(Value) -> Value + Send + Sync>;

/// Errors that can occur when fetching a URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL did not parse; raised before any cache or network activity
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The network call failed and no cached value existed to fall back on
    #[error(transparent)]
    Network(#[from] HttpError),

    /// Reading or writing the cache store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Options for `fetch`
///
/// `query` and `headers` pass through to the HTTP client verbatim and are
/// part of the request's cache identity; `max_age` and `transform` are
/// cache-side concerns and deliberately are not.
#[derive(Default)]
pub struct FetchOptions {
    /// Cache the (transformed) response for this long. Without it the
    /// response is returned but never persisted.
    pub max_age: Option<Duration>,
    /// Query parameters appended to the URL
    pub query: BTreeMap<String, String>,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Applied to the response body before caching and returning
    pub transform: Option<Transform>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the response for `max_age`
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Add a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Transform the response body before it is cached and returned
    pub fn with_transform(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }
}

/// Request identity used for cache-key derivation.
///
/// Holds everything that distinguishes one request from another and nothing
/// that does not: `transform` and `max_age` change what happens to the
/// response, not which response is asked for, so they are excluded.
#[derive(Serialize)]
struct KeyIdentity<'a> {
    query: &'a BTreeMap<String, String>,
    headers: &'a BTreeMap<String, String>,
}

/// Derives the cache key for a request
///
/// Pure function of the URL and the request-shaping options. `BTreeMap`
/// iteration is sorted, so two option sets with the same entries in
/// different insertion order derive the same key.
pub(crate) fn cache_key(url: &str, options: &FetchOptions) -> String {
    let identity = KeyIdentity {
        query: &options.query,
        headers: &options.headers,
    };

    // Serializing a struct of maps to JSON cannot fail
    let serialized = serde_json::to_string(&identity).unwrap_or_default();
    format!("{}{}", url, serialized)
}

/// Fetches `url`, serving from cache when possible and falling back to
/// stale cache when the network fails
///
/// Control flow:
/// 1. Validate the URL; fail with `InvalidUrl` before touching anything.
/// 2. Derive the cache key and peek at any cached value (stale included).
/// 3. A live cached value is returned immediately, with no network call.
/// 4. Otherwise GET the URL, apply `transform` if supplied, persist the
///    result when `max_age` is set, and return it.
/// 5. If the GET fails and any cached value exists, even an expired one,
///    return that instead of the error.
///
/// # Returns
/// * `Ok(Value)` - The fresh, freshly fetched, or stale-fallback data
/// * `Err(FetchError::InvalidUrl)` - `url` did not parse
/// * `Err(FetchError::Network)` - The GET failed and nothing was cached
/// * `Err(FetchError::Store)` - The cache store could not be read or written
pub async fn fetch(
    client: &impl HttpClient,
    cache: &mut TtlCache,
    url: &str,
    options: FetchOptions,
) -> Result<Value, FetchError> {
    reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

    let key = cache_key(url, &options);

    // Peek with ignore_max_age so an expired entry stays around as the
    // fallback candidate
    let cached: Option<Value> = cache.get_with(&key, GetOptions { ignore_max_age: true })?;

    if let Some(cached) = &cached {
        if !cache.is_expired(&key) {
            return Ok(cached.clone());
        }
    }

    match client.get_json(url, &options.query, &options.headers).await {
        Ok(body) => {
            let data = match &options.transform {
                Some(transform) => transform(body),
                None => body,
            };

            if let Some(max_age) = options.max_age.filter(|max_age| !max_age.is_zero()) {
                cache.set(&key, &data, SetOptions::max_age(max_age))?;
            }

            Ok(data)
        }
        Err(err) => match cached {
            Some(stale) => Ok(stale),
            None => Err(err.into()),
        },
    }
}
