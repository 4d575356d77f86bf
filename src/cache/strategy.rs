// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache strategies layered over [`CacheManager`].
//!
//! - [`cache_first`]: tiles. Serve from cache, fetch only on miss, and turn a
//!   failed miss into a synthesized 408.
//! - [`network_first`]: app shell. Always try the wire, refresh the cache on
//!   success, and fall back to cache, then offline document, then 503.
//!
//! Neither strategy ever surfaces a raw [`NetworkError`](crate::NetworkError).
//! Only 2xx responses are stored.

use tracing::{debug, warn};

use super::manager::{CacheKind, CacheManager};
use crate::network::Network;
use crate::request::{InterceptedRequest, RequestIdentity, ResponseSnapshot};

pub async fn cache_first(
    caches: &CacheManager,
    network: &dyn Network,
    request: &InterceptedRequest,
) -> ResponseSnapshot {
    let key = request.identity();
    if let Some(hit) = caches.get(CacheKind::Tiles, &key) {
        crate::metrics::record_cache_lookup(CacheKind::Tiles.label(), "hit");
        return hit;
    }
    crate::metrics::record_cache_lookup(CacheKind::Tiles.label(), "miss");

    match network.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                caches.put(CacheKind::Tiles, key, response.clone());
            }
            response
        }
        Err(e) => {
            debug!(url = %request.url, error = %e, "Tile fetch failed on cache miss");
            ResponseSnapshot::tile_unavailable()
        }
    }
}

pub async fn network_first(
    caches: &CacheManager,
    network: &dyn Network,
    request: &InterceptedRequest,
    offline_document: &str,
) -> ResponseSnapshot {
    let key = request.identity();
    let error = match network.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                caches.put(CacheKind::AppShell, key, response.clone());
            }
            return response;
        }
        Err(e) => e,
    };

    if let Some(hit) = caches.get(CacheKind::AppShell, &key) {
        crate::metrics::record_cache_lookup(CacheKind::AppShell.label(), "fallback_hit");
        debug!(url = %request.url, error = %error, "Serving cached app-shell entry");
        return hit;
    }

    if request.is_navigation() {
        if let Some(document) = offline_document_key(request, offline_document)
            .and_then(|doc_key| caches.get(CacheKind::AppShell, &doc_key))
        {
            crate::metrics::record_cache_lookup(CacheKind::AppShell.label(), "offline_document");
            return document;
        }
    }

    crate::metrics::record_cache_lookup(CacheKind::AppShell.label(), "miss");
    warn!(url = %request.url, error = %error, "Network unreachable and nothing cached");
    ResponseSnapshot::offline()
}

/// Cache key of the offline document on the request's own origin.
fn offline_document_key(request: &InterceptedRequest, offline_document: &str) -> Option<RequestIdentity> {
    request
        .url
        .join(offline_document)
        .ok()
        .map(|url| RequestIdentity::new("GET", &url))
}
