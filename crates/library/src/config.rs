use std::collections::HashSet;
use std::time::Duration;

use reelbase_core::CollectionConfig;
use serde::Deserialize;

pub const COLLECTIONS_VAR: &str = "REELBASE_COLLECTIONS";
pub const REFRESH_SECS_VAR: &str = "REELBASE_REFRESH_SECS";
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Startup configuration of the indexing engine.
///
/// Deserializing goes through [`LibraryConfig::validated`], so an embedded
/// configuration is held to the same rules as one read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLibraryConfig")]
pub struct LibraryConfig {
    /// Collection roots, scanned and published in this order.
    pub collections: Vec<CollectionConfig>,
    pub refresh_interval: Duration,
}

#[derive(Deserialize)]
struct RawLibraryConfig {
    #[serde(default)]
    collections: Vec<CollectionConfig>,
    #[serde(default = "default_refresh_secs")]
    refresh_interval_secs: u64,
}

impl TryFrom<RawLibraryConfig> for LibraryConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLibraryConfig) -> Result<Self, Self::Error> {
        Self::new(raw.collections, Duration::from_secs(raw.refresh_interval_secs)).validated()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid REELBASE_COLLECTIONS: {0}")]
    Collections(#[from] serde_json::Error),

    #[error("invalid REELBASE_REFRESH_SECS: {0:?} is not a number of seconds")]
    RefreshInterval(String),

    #[error("refresh interval must be greater than zero")]
    ZeroInterval,

    #[error("duplicate collection id {0}")]
    DuplicateId(String),
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(DEFAULT_REFRESH_SECS)
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

impl LibraryConfig {
    pub fn new(collections: Vec<CollectionConfig>, refresh_interval: Duration) -> Self {
        Self {
            collections,
            refresh_interval,
        }
    }

    /// Load from `REELBASE_COLLECTIONS` and `REELBASE_REFRESH_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup. Missing variables fall back
    /// to no collections and the default interval.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let collections = match lookup(COLLECTIONS_VAR) {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => Vec::new(),
        };
        let refresh_interval = match lookup(REFRESH_SECS_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::RefreshInterval(raw))?,
            None => default_refresh_interval(),
        };
        Self::new(collections, refresh_interval).validated()
    }

    /// Fill in derived collection ids and reject configurations the
    /// repository cannot run with.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        let mut seen = HashSet::new();
        for cfg in &mut self.collections {
            cfg.ensure_id();
            if !seen.insert(cfg.id.clone()) {
                return Err(ConfigError::DuplicateId(cfg.id.clone()));
            }
        }
        Ok(self)
    }
}
