//! launchkit — helper library for desktop launcher workflow scripts
//!
//! Scripts backing a launcher's workflow plugins are short-lived: they run
//! once per keystroke or action, talk to some web API, print results, and
//! exit. This crate gives them the stateful pieces that make that pleasant:
//!
//! - [`store::Store`] — a persistent key/value store, one JSON document per
//!   directory, rewritten in full on every mutation
//! - [`cache::TtlCache`] — expiry-aware caching layered on a `Store`
//! - [`fetch::fetch`] — HTTP GET through the cache, with stale responses
//!   served as a fallback when the network fails
//! - [`workflow::Workflow`] — one host-owned instance wiring the above to
//!   explicit data/cache directories and a `reqwest` client

pub mod cache;
pub mod fetch;
pub mod http;
pub mod store;
pub mod workflow;

pub use cache::{CacheEntry, GetOptions, SetOptions, TtlCache};
pub use fetch::{fetch, FetchError, FetchOptions, Transform};
pub use http::{HttpClient, HttpError, ReqwestClient};
pub use store::{Store, StoreError};
pub use workflow::{Workflow, WorkflowEnv};
