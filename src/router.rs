// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Policy router: one disposition per intercepted request.
//!
//! Classification order, first match wins:
//!
//! 1. Non-GET, offline, path contains a syncable fragment → [`Disposition::Enqueue`].
//!    Any other non-GET (online, or not syncable) → [`Disposition::PassThrough`].
//! 2. GET to an excluded host → [`Disposition::PassThrough`].
//! 3. GET to a tile host → [`Disposition::TileCache`].
//! 4. Any other GET → [`Disposition::AppCache`].
//!
//! Classification is total and infallible; anything unrecognized passes
//! through untouched.

use std::sync::Arc;
use tracing::{debug, error};

use crate::cache::{cache_first, network_first, CacheManager};
use crate::config::RelayConfig;
use crate::connectivity::Connectivity;
use crate::error::RelayError;
use crate::network::Network;
use crate::queue::{MutationStore, NewMutation};
use crate::request::{InterceptedRequest, ResponseSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Capture into the durable queue and acknowledge with 202
    Enqueue,
    /// Forward to the network untouched, no caching
    PassThrough,
    /// Cache-first against the tile namespace
    TileCache,
    /// Network-first against the app-shell namespace
    AppCache,
}

impl Disposition {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::PassThrough => "pass_through",
            Self::TileCache => "tile_cache",
            Self::AppCache => "app_cache",
        }
    }
}

/// Static routing tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub syncable_paths: Vec<String>,
    pub excluded_origins: Vec<String>,
    pub tile_origins: Vec<String>,
}

impl RoutingPolicy {
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            syncable_paths: config.syncable_paths.clone(),
            excluded_origins: config.excluded_origins.clone(),
            tile_origins: config.tile_origins.clone(),
        }
    }

    #[must_use]
    pub fn classify(&self, request: &InterceptedRequest, online: bool) -> Disposition {
        if !request.is_get() {
            return if !online && self.is_syncable(request.path()) {
                Disposition::Enqueue
            } else {
                Disposition::PassThrough
            };
        }

        let Some(host) = request.host() else {
            return Disposition::PassThrough;
        };
        if host_matches(host, &self.excluded_origins) {
            Disposition::PassThrough
        } else if host_matches(host, &self.tile_origins) {
            Disposition::TileCache
        } else {
            Disposition::AppCache
        }
    }

    #[must_use]
    pub fn is_syncable(&self, path: &str) -> bool {
        self.syncable_paths.iter().any(|fragment| path.contains(fragment.as_str()))
    }
}

/// `host` equals a listed domain or is a subdomain of one.
fn host_matches(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|domain| {
        host.eq_ignore_ascii_case(domain)
            || host
                .len()
                .checked_sub(domain.len() + 1)
                .is_some_and(|split| {
                    host.as_bytes()[split] == b'.' && host[split + 1..].eq_ignore_ascii_case(domain)
                })
    })
}

pub struct PolicyRouter {
    policy: RoutingPolicy,
    caches: Arc<CacheManager>,
    store: Arc<dyn MutationStore>,
    network: Arc<dyn Network>,
    connectivity: Arc<Connectivity>,
    offline_document: String,
}

impl PolicyRouter {
    #[must_use]
    pub fn new(
        policy: RoutingPolicy,
        caches: Arc<CacheManager>,
        store: Arc<dyn MutationStore>,
        network: Arc<dyn Network>,
        connectivity: Arc<Connectivity>,
        offline_document: impl Into<String>,
    ) -> Self {
        Self {
            policy,
            caches,
            store,
            network,
            connectivity,
            offline_document: offline_document.into(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Produce the response for one intercepted request.
    ///
    /// Errors only when the queue cannot accept a mutation, or when a
    /// pass-through request gets no response at all.
    pub async fn handle(&self, request: InterceptedRequest) -> Result<ResponseSnapshot, RelayError> {
        let disposition = self.policy.classify(&request, self.connectivity.is_online());
        crate::metrics::record_disposition(disposition.label());
        debug!(
            method = %request.method,
            url = %request.url,
            disposition = disposition.label(),
            "Routing request"
        );

        match disposition {
            Disposition::Enqueue => {
                let id = self
                    .store
                    .enqueue(NewMutation::from_request(&request))
                    .await
                    .inspect_err(|e| {
                        error!(url = %request.url, error = %e, "Failed to queue offline mutation");
                        crate::metrics::record_storage_error("enqueue");
                    })?;
                crate::metrics::record_enqueued();
                debug!(id, url = %request.url, "Mutation queued for replay");
                Ok(ResponseSnapshot::queued())
            }
            Disposition::PassThrough => Ok(self.network.fetch(&request).await?),
            Disposition::TileCache => Ok(cache_first(&self.caches, self.network.as_ref(), &request).await),
            Disposition::AppCache => Ok(network_first(
                &self.caches,
                self.network.as_ref(),
                &request,
                &self.offline_document,
            )
            .await),
        }
    }
}
