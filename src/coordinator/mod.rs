// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Relay coordinator.
//!
//! [`OfflineRelay`] is the single owner of every component:
//! - app-shell and tile caches
//! - the durable mutation queue
//! - the policy router that sits in front of the network
//! - the replay engine and the client notification hub
//!
//! # Lifecycle
//!
//! ```text
//! Created → Installing → Ready → Running → ShuttingDown
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use offline_relay::{InterceptedRequest, OfflineRelay, RelayConfig, RelayState};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let relay = OfflineRelay::new(RelayConfig::default())?;
//! assert_eq!(relay.state(), RelayState::Created);
//!
//! relay.install().await;
//! relay.start().await?;
//!
//! let response = relay.handle(InterceptedRequest::get("https://app.example/")?).await?;
//! println!("{} from {:?}", response.status, response.source);
//! # Ok(())
//! # }
//! ```

mod lifecycle;
mod types;

pub use types::{RelayState, RelayStatus};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheKind, CacheManager};
use crate::config::RelayConfig;
use crate::connectivity::Connectivity;
use crate::error::RelayError;
use crate::messages::{ClientMessage, SyncMessage, OFFLINE_QUEUE_SYNC};
use crate::network::{HttpNetwork, Network};
use crate::notify::{NotificationHub, Subscription};
use crate::queue::{MutationStore, SqliteMutationStore};
use crate::replay::{ReplayEngine, ReplaySummary};
use crate::request::{InterceptedRequest, ResponseSnapshot};
use crate::resilience::retry::RetryPolicy;
use crate::router::{PolicyRouter, RoutingPolicy};

pub struct OfflineRelay {
    config: RelayConfig,
    caches: Arc<CacheManager>,
    store: Arc<dyn MutationStore>,
    network: Arc<dyn Network>,
    connectivity: Arc<Connectivity>,
    hub: Arc<NotificationHub>,
    router: PolicyRouter,
    replay: ReplayEngine,
    state: watch::Sender<RelayState>,
}

impl OfflineRelay {
    /// Build a relay backed by a SQLite queue at `config.queue_path` and a
    /// reqwest client. The queue file is not opened until first use.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let network = HttpNetwork::new(Duration::from_millis(config.request_timeout_ms))?;
        let store = SqliteMutationStore::new(&config.queue_path);
        Ok(Self::with_parts(config, Arc::new(store), Arc::new(network)))
    }

    /// Build a relay from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        config: RelayConfig,
        store: Arc<dyn MutationStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        let caches = Arc::new(CacheManager::from_config(&config));
        let connectivity = Arc::new(Connectivity::default());
        let hub = Arc::new(NotificationHub::new());

        let router = PolicyRouter::new(
            RoutingPolicy::from_config(&config),
            caches.clone(),
            store.clone(),
            network.clone(),
            connectivity.clone(),
            config.offline_document.clone(),
        );
        let replay = ReplayEngine::new(
            store.clone(),
            network.clone(),
            hub.clone(),
            RetryPolicy::new(config.max_retries),
        );
        let (state, _) = watch::channel(RelayState::Created);

        Self {
            config,
            caches,
            store,
            network,
            connectivity,
            hub,
            router,
            replay,
            state,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn caches(&self) -> &CacheManager {
        &self.caches
    }

    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Route one intercepted request through the policy router.
    pub async fn handle(&self, request: InterceptedRequest) -> Result<ResponseSnapshot, RelayError> {
        self.router.handle(request).await
    }

    /// Register a client for sync notifications.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: crate::notify::ClientId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Record a connectivity change reported by the runtime.
    ///
    /// An offline → online edge starts a replay pass and returns its summary.
    /// While [`run`](Self::run) is active the run loop owns that replay and
    /// this returns `Ok(None)`, as it does when nothing changed. A storage
    /// failure during the pass is returned; the connectivity change still stands.
    pub async fn set_online(&self, online: bool) -> Result<Option<ReplaySummary>, RelayError> {
        let restored = self.connectivity.set_online(online);
        crate::metrics::set_online(online);
        if !restored || self.state() == RelayState::Running {
            debug!(online, restored, "Connectivity updated");
            return Ok(None);
        }
        info!(trigger = "reconnect", "Replaying offline queue");
        match self.replay.replay().await {
            Ok(summary) => Ok(Some(summary)),
            Err(e) => {
                crate::metrics::record_storage_error("replay");
                Err(e.into())
            }
        }
    }

    /// Replay and log instead of propagating. Used by the background triggers.
    async fn replay_logged(&self, trigger: &'static str) -> Option<ReplaySummary> {
        info!(trigger, "Replaying offline queue");
        match self.replay.replay().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(trigger, error = %e, "Replay pass aborted");
                crate::metrics::record_storage_error("replay");
                None
            }
        }
    }

    /// Run one replay pass now.
    pub async fn replay(&self) -> Result<ReplaySummary, RelayError> {
        Ok(self.replay.replay().await?)
    }

    /// Handle a message posted by a client.
    ///
    /// Returns the reply for request/response style messages.
    pub async fn handle_message(&self, message: ClientMessage) -> Result<Option<SyncMessage>, RelayError> {
        match message {
            ClientMessage::ProcessOfflineQueue => {
                self.replay().await?;
                Ok(None)
            }
            ClientMessage::GetQueueStatus => {
                let pending = self.store.count().await?;
                Ok(Some(SyncMessage::QueueStatus {
                    pending,
                    online: self.is_online(),
                }))
            }
        }
    }

    /// Handle a background-sync event delivered by the runtime.
    ///
    /// Only [`OFFLINE_QUEUE_SYNC`] triggers a replay; other tags return `None`.
    pub async fn handle_sync_event(&self, tag: &str) -> Result<Option<ReplaySummary>, RelayError> {
        if tag != OFFLINE_QUEUE_SYNC {
            debug!(tag, "Ignoring unknown sync tag");
            return Ok(None);
        }
        Ok(Some(self.replay().await?))
    }

    pub async fn status(&self) -> Result<RelayStatus, RelayError> {
        let pending = self.store.count().await?;
        crate::metrics::set_queue_pending(pending);
        Ok(RelayStatus {
            online: self.is_online(),
            pending,
            app_entries: self.caches.len(CacheKind::AppShell),
            tile_entries: self.caches.len(CacheKind::Tiles),
            subscribers: self.hub.subscriber_count(),
        })
    }
}
