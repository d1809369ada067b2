//! TTL cache layered on the persistent store
//!
//! This module provides a `TtlCache` that attaches an optional expiry
//! timestamp to each stored value. Expired entries are treated as absent by
//! the read path and evicted on access, while `ignore_max_age` lets a caller
//! peek at stale data without evicting it. That peek is what makes the
//! fetch layer's stale-on-error fallback possible.

mod ttl;

pub use ttl::{CacheEntry, GetOptions, SetOptions, TtlCache};
