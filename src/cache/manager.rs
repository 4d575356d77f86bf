// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Owner of the two cache namespaces.
//!
//! The app-shell and tile namespaces never share entries or evict each
//! other; every call names the namespace it targets via [`CacheKind`].

use tracing::debug;

use super::namespace::{BoundedCache, CacheNamespace};
use crate::config::RelayConfig;
use crate::request::{RequestIdentity, ResponseSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Pages, scripts and API reads (network-first)
    AppShell,
    /// Map tiles (cache-first)
    Tiles,
}

impl CacheKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AppShell => "app_shell",
            Self::Tiles => "tiles",
        }
    }
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub struct CacheManager {
    app_shell: BoundedCache,
    tiles: BoundedCache,
}

impl CacheManager {
    #[must_use]
    pub fn new(app_shell: CacheNamespace, tiles: CacheNamespace) -> Self {
        Self {
            app_shell: BoundedCache::new(app_shell),
            tiles: BoundedCache::new(tiles),
        }
    }

    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.app_namespace(), config.tile_namespace())
    }

    #[must_use]
    pub fn namespace(&self, kind: CacheKind) -> &BoundedCache {
        match kind {
            CacheKind::AppShell => &self.app_shell,
            CacheKind::Tiles => &self.tiles,
        }
    }

    #[must_use]
    pub fn get(&self, kind: CacheKind, key: &RequestIdentity) -> Option<ResponseSnapshot> {
        self.namespace(kind).get(key)
    }

    /// Store a snapshot and trim the namespace back to capacity.
    ///
    /// Returns the number of entries evicted by the trim.
    pub fn put(&self, kind: CacheKind, key: RequestIdentity, value: ResponseSnapshot) -> usize {
        self.namespace(kind).insert(key, value);
        self.trim(kind)
    }

    /// Evict the oldest entries above capacity. Returns how many were evicted.
    pub fn trim(&self, kind: CacheKind) -> usize {
        let cache = self.namespace(kind);
        let evicted = cache.trim();
        if !evicted.is_empty() {
            debug!(
                namespace = %cache.name(),
                evicted = evicted.len(),
                oldest = %evicted[0],
                "Trimmed cache namespace"
            );
            crate::metrics::record_cache_evictions(kind.label(), evicted.len());
        }
        crate::metrics::set_cache_entries(kind.label(), cache.len());
        evicted.len()
    }

    #[must_use]
    pub fn len(&self, kind: CacheKind) -> usize {
        self.namespace(kind).len()
    }
}
