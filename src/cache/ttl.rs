//! Expiry-aware cache built by composition over `Store`
//!
//! Each cached value is wrapped in a `CacheEntry` carrying an optional
//! absolute expiry timestamp. An entry whose timestamp has passed is
//! logically absent: `get` and `has` evict it from the underlying store and
//! report a miss. A `max_age` of zero or no `max_age` at all both mean the
//! entry never expires.

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::store::{Store, StoreError};

/// Wrapper for cached values stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload
    pub data: Value,
    /// Absolute expiry timestamp in milliseconds since epoch; `None` means
    /// the entry never expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Options for `TtlCache::set`
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// How long the entry stays fresh. `None` or `Duration::ZERO` mean the
    /// entry never expires.
    pub max_age: Option<Duration>,
}

impl SetOptions {
    /// Options with the given time-to-live
    pub fn max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
        }
    }
}

/// Options for `TtlCache::get_with`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Return the stored value even if it has expired, without evicting it
    pub ignore_max_age: bool,
}

/// Expiry-aware key/value cache owning a persistent `Store`
///
/// The cache delegates raw reads and writes to its store; only the expiry
/// bookkeeping lives here. The store is owned rather than inherited from so
/// tests (or other hosts) can hand in a store rooted anywhere.
#[derive(Debug, Clone)]
pub struct TtlCache {
    store: Store,
}

impl TtlCache {
    /// Wraps an already opened store
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Opens a cache store in the given directory
    ///
    /// Convenience for `Store::open` followed by `TtlCache::new`. The
    /// version tag follows the store's reset-on-mismatch policy, which is
    /// how a workflow upgrade invalidates cached responses from older
    /// releases in one sweep.
    pub fn open(
        dir: impl Into<PathBuf>,
        name: &str,
        version: Option<&str>,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(Store::open(dir, name, version)?))
    }

    /// Stores `value` under `key`, overwriting any prior entry
    ///
    /// With `SetOptions::max_age` the entry expires that far in the future;
    /// without it (or with a zero duration) the entry never expires.
    pub fn set<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        let expires_at = options
            .max_age
            .filter(|max_age| !max_age.is_zero())
            .map(|max_age| Utc::now().timestamp_millis() + max_age.as_millis() as i64);

        let entry = CacheEntry {
            data: serde_json::to_value(value).map_err(|source| StoreError::Serialize {
                key: key.to_string(),
                source,
            })?,
            expires_at,
        };

        self.store.set(key, &entry)
    }

    /// Returns the live value stored under `key`
    ///
    /// An expired entry is evicted from the store and reported as `None`.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StoreError> {
        self.get_with(key, GetOptions::default())
    }

    /// Returns the value stored under `key`, honoring `GetOptions`
    ///
    /// With `ignore_max_age` set the raw, possibly stale value is returned
    /// and nothing is evicted; this is the peek the fetch layer uses to keep
    /// a fallback candidate alive while deciding whether to hit the network.
    pub fn get_with<T: DeserializeOwned>(
        &mut self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<T>, StoreError> {
        let Some(entry) = self.store.get::<CacheEntry>(key) else {
            return Ok(None);
        };

        if !options.ignore_max_age && Self::entry_expired(&entry) {
            self.store.delete(key)?;
            return Ok(None);
        }

        Ok(serde_json::from_value(entry.data).ok())
    }

    /// Returns true if a live entry exists for `key`
    ///
    /// An expired entry is evicted as a side effect and reported absent.
    pub fn has(&mut self, key: &str) -> Result<bool, StoreError> {
        let Some(entry) = self.store.get::<CacheEntry>(key) else {
            return Ok(false);
        };

        if Self::entry_expired(&entry) {
            self.store.delete(key)?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Returns true if the entry for `key` exists and has expired
    ///
    /// Does not mutate the store, so an expired entry is still available to
    /// `get_with` afterwards.
    pub fn is_expired(&self, key: &str) -> bool {
        self.store
            .get::<CacheEntry>(key)
            .is_some_and(|entry| Self::entry_expired(&entry))
    }

    /// Removes the entry for `key`, expired or not
    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key)
    }

    /// Removes all entries
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear()
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn entry_expired(entry: &CacheEntry) -> bool {
        entry
            .expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now().timestamp_millis())
    }
}
