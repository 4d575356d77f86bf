// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Relay lifecycle: install, start, run loop, shutdown.

use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::CacheKind;
use crate::error::RelayError;
use crate::request::InterceptedRequest;

use super::{OfflineRelay, RelayState};

impl OfflineRelay {
    /// Precache the app shell.
    ///
    /// Fetches every `precache_urls` entry and stores 2xx responses in the
    /// app-shell namespace. List the offline document here so navigation
    /// fallback works on the very first offline visit. A failed entry is
    /// logged and skipped. Returns how many entries were stored.
    #[tracing::instrument(skip(self), fields(urls = self.config.precache_urls.len()))]
    pub async fn install(&self) -> usize {
        let started = Instant::now();
        self.state.send_replace(RelayState::Installing);

        let mut stored = 0;
        for raw in &self.config.precache_urls {
            let request = match InterceptedRequest::get(raw) {
                Ok(request) => request,
                Err(e) => {
                    warn!(url = %raw, error = %e, "Skipping unparseable precache URL");
                    continue;
                }
            };
            match self.network.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    self.caches.put(CacheKind::AppShell, request.identity(), response);
                    stored += 1;
                }
                Ok(response) => {
                    warn!(url = %raw, status = response.status, "Precache fetch returned non-success");
                }
                Err(e) => {
                    warn!(url = %raw, error = %e, "Precache fetch failed");
                }
            }
        }

        self.state.send_replace(RelayState::Ready);
        info!(
            stored,
            requested = self.config.precache_urls.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "App shell precached"
        );
        stored
    }

    /// Mark the relay ready and flush anything left over from a previous run.
    ///
    /// Opens the queue (for SQLite, this is the first touch of the file),
    /// publishes the pending gauge, and replays immediately when online and
    /// the queue is non-empty.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) -> Result<(), RelayError> {
        let pending = self.store.count().await?;
        crate::metrics::set_queue_pending(pending);
        crate::metrics::set_online(self.is_online());
        if self.state() == RelayState::Created {
            self.state.send_replace(RelayState::Ready);
        }

        if pending > 0 && self.is_online() {
            info!(pending, "Replaying mutations left from a previous session");
            self.replay.replay().await?;
        } else {
            info!(pending, online = self.is_online(), "Relay started");
        }
        Ok(())
    }

    /// Background loop: replay on every offline → online edge until
    /// `shutdown` flips to `true` or its sender is dropped.
    ///
    /// On entry, rows already queued are replayed once if the relay is
    /// online, so the loop can be started without a prior [`start`](Self::start).
    /// Reconnects that land while a pass is running are folded into one
    /// follow-up pass.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut reconnects = self.connectivity.subscribe_reconnects();
        reconnects.mark_unchanged();
        self.state.send_replace(RelayState::Running);
        info!("Offline relay running");

        if self.is_online() {
            match self.store.count().await {
                Ok(0) => {}
                Ok(pending) => {
                    debug!(pending, "Queue not empty at run start");
                    self.replay_logged("startup").await;
                }
                Err(e) => {
                    warn!(error = %e, "Could not count pending mutations at run start");
                    crate::metrics::record_storage_error("count");
                }
            }
        }

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                changed = reconnects.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let seen = *reconnects.borrow_and_update();
                    debug!(reconnects = seen, "Connectivity restored");
                    self.replay_logged("reconnect").await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Offline relay run loop exited");
        if self.state() == RelayState::Running {
            self.state.send_replace(RelayState::Ready);
        }
    }

    /// Graceful shutdown: waits for an in-flight replay pass, then closes
    /// the queue. Pending mutations stay durable for the next start.
    pub async fn shutdown(&self) {
        info!("Initiating offline relay shutdown...");
        self.state.send_replace(RelayState::ShuttingDown);
        self.replay.wait_idle().await;

        let pending = match self.store.count().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Could not count pending mutations on shutdown");
                0
            }
        };
        self.store.close().await;
        info!(pending, "Offline relay shutdown complete");
    }
}
