//! Workflow instance owning the config store, cache, and HTTP client
//!
//! The host script constructs one `Workflow` from an explicit
//! `WorkflowEnv` (directories and version supplied by the launcher, or
//! discovered via XDG paths) and passes it around for the lifetime of the
//! invocation. Nothing here reads environment variables or global state,
//! so tests can build isolated instances against temp directories.

use serde_json::Value;
use std::path::PathBuf;

use crate::cache::TtlCache;
use crate::fetch::{self, FetchError, FetchOptions};
use crate::http::ReqwestClient;
use crate::store::{Store, StoreError};

/// Directories and version tag a workflow runs against
#[derive(Debug, Clone)]
pub struct WorkflowEnv {
    /// Directory for the persistent config store
    pub data_dir: PathBuf,
    /// Directory for the TTL cache store
    pub cache_dir: PathBuf,
    /// Workflow version; a change resets the cache store on open
    pub version: Option<String>,
}

impl WorkflowEnv {
    /// Builds an environment from explicit directories
    pub fn new(data_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache_dir: cache_dir.into(),
            version: None,
        }
    }

    /// Tags the environment with a workflow version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Discovers XDG-compliant data and cache directories for `name`
    ///
    /// Uses `~/.local/share/<name>` and `~/.cache/<name>` on Linux, or the
    /// platform equivalents. Returns `None` if the home directory cannot be
    /// determined.
    pub fn discover(name: &str) -> Option<Self> {
        let project_dirs = directories::ProjectDirs::from("", "", name)?;
        Some(Self::new(
            project_dirs.data_dir(),
            project_dirs.cache_dir(),
        ))
    }
}

/// One workflow invocation's stores and network client
///
/// `config` is the plain persistent store for user settings (no TTL);
/// `cache` holds fetched responses with expiry. Both are opened eagerly so
/// a corrupt document fails at startup rather than mid-invocation.
pub struct Workflow {
    /// Persistent user/workflow settings, no expiry
    pub config: Store,
    /// Versioned response cache with TTL
    pub cache: TtlCache,
    client: ReqwestClient,
}

impl Workflow {
    /// Opens the config and cache stores for the given environment
    ///
    /// # Returns
    /// * `Ok(Workflow)` on success
    /// * `Err(StoreError::Corrupt)` if either on-disk document is unreadable
    ///   as JSON; fatal at startup by design
    pub fn new(env: WorkflowEnv) -> Result<Self, StoreError> {
        let config = Store::open(&env.data_dir, "config", None)?;
        let cache = TtlCache::open(&env.cache_dir, "cache", env.version.as_deref())?;

        Ok(Self {
            config,
            cache,
            client: ReqwestClient::new(),
        })
    }

    /// Replaces the default HTTP client with a preconfigured one
    ///
    /// Timeout and retry policy live on the `reqwest::Client` handed in
    /// here; the cache layer adds none of its own.
    pub fn with_client(mut self, client: ReqwestClient) -> Self {
        self.client = client;
        self
    }

    /// Fetches `url` through the workflow's cache
    ///
    /// See [`fetch::fetch`] for the full contract: live cache hits skip the
    /// network, results are persisted when `max_age` is set, and stale
    /// cache masks network failures.
    pub async fn fetch(&mut self, url: &str, options: FetchOptions) -> Result<Value, FetchError> {
        fetch::fetch(&self.client, &mut self.cache, url, options).await
    }
}
