// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the offline relay.
//!
//! # Example
//!
//! ```
//! use offline_relay::RelayConfig;
//!
//! // Minimal config (uses defaults)
//! let config = RelayConfig::default();
//! assert_eq!(config.max_retries, 3);
//! assert_eq!(config.tile_cache_max_entries, 500);
//!
//! // Overrides from TOML; anything omitted keeps its default
//! let config = RelayConfig::from_toml_str(r#"
//!     queue_path = "/var/lib/relay/queue.db"
//!     tile_cache_max_entries = 200
//! "#).unwrap();
//! assert_eq!(config.tile_cache_max_entries, 200);
//! assert_eq!(config.app_cache_max_entries, 60);
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::cache::CacheNamespace;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the offline relay.
///
/// All fields have sensible defaults; most deployments only set `queue_path`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// SQLite file backing the durable mutation queue
    #[serde(default = "default_queue_path")]
    pub queue_path: String,

    /// App-shell cache namespace
    #[serde(default = "default_app_cache_name")]
    pub app_cache_name: String,
    #[serde(default = "default_app_cache_max_entries")]
    pub app_cache_max_entries: usize,

    /// Map tile cache namespace
    #[serde(default = "default_tile_cache_name")]
    pub tile_cache_name: String,
    #[serde(default = "default_tile_cache_max_entries")]
    pub tile_cache_max_entries: usize,

    /// Replay attempts allowed after the first failure before a mutation is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Path fragments eligible for offline queuing
    #[serde(default = "default_syncable_paths")]
    pub syncable_paths: Vec<String>,

    /// Hosts never intercepted (identity, analytics, weather)
    #[serde(default = "default_excluded_origins")]
    pub excluded_origins: Vec<String>,

    /// Hosts served with the cache-first tile strategy
    #[serde(default = "default_tile_origins")]
    pub tile_origins: Vec<String>,

    /// Path of the document served to navigations when offline and uncached
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Absolute URLs fetched into the app-shell cache on install
    #[serde(default)]
    pub precache_urls: Vec<String>,

    /// Transport timeout for outbound requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_queue_path() -> String { "./offline_relay_queue.db".to_string() }
fn default_app_cache_name() -> String { "app-shell-v1".to_string() }
fn default_app_cache_max_entries() -> usize { 60 }
fn default_tile_cache_name() -> String { "tiles-v1".to_string() }
fn default_tile_cache_max_entries() -> usize { 500 }
fn default_max_retries() -> u32 { 3 }
fn default_syncable_paths() -> Vec<String> {
    vec!["/reports".into(), "/verify".into(), "/resolve".into()]
}
fn default_excluded_origins() -> Vec<String> {
    vec![
        "identitytoolkit.googleapis.com".into(),
        "securetoken.googleapis.com".into(),
        "firebaseinstallations.googleapis.com".into(),
        "google-analytics.com".into(),
        "googletagmanager.com".into(),
        "api.openweathermap.org".into(),
    ]
}
fn default_tile_origins() -> Vec<String> {
    vec![
        "tile.openstreetmap.org".into(),
        "basemaps.cartocdn.com".into(),
        "server.arcgisonline.com".into(),
    ]
}
fn default_offline_document() -> String { "/offline.html".to_string() }
fn default_request_timeout_ms() -> u64 { 30_000 }

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_path: default_queue_path(),
            app_cache_name: default_app_cache_name(),
            app_cache_max_entries: default_app_cache_max_entries(),
            tile_cache_name: default_tile_cache_name(),
            tile_cache_max_entries: default_tile_cache_max_entries(),
            max_retries: default_max_retries(),
            syncable_paths: default_syncable_paths(),
            excluded_origins: default_excluded_origins(),
            tile_origins: default_tile_origins(),
            offline_document: default_offline_document(),
            precache_urls: Vec::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RelayConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    #[must_use]
    pub fn app_namespace(&self) -> CacheNamespace {
        CacheNamespace::new(&self.app_cache_name, self.app_cache_max_entries)
    }

    #[must_use]
    pub fn tile_namespace(&self) -> CacheNamespace {
        CacheNamespace::new(&self.tile_cache_name, self.tile_cache_max_entries)
    }
}
