// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replay engine: drains the mutation queue against the live network.
//!
//! One pass reads every pending row in enqueue order and resolves each one
//! sequentially through [`RetryPolicy`]:
//!
//! - synced → delete, notify `sync-success`
//! - retry → bump `retry_count`, keep the row for the next pass
//! - abandon → delete, notify `sync-failed`
//!
//! Rows the store can no longer decode are dropped with a `sync-failed`
//! notification before the rest of the pass runs.
//!
//! The whole pass is one critical section. A concurrent `replay()` waits for
//! the in-flight pass and then re-reads the queue, so two passes never
//! interleave their read-modify-delete cycles. Rows enqueued during a pass
//! are picked up by the next one.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::messages::ReplayOutcome;
use crate::network::Network;
use crate::notify::NotificationHub;
use crate::queue::{CorruptMutation, MutationPatch, MutationStore, PendingMutation, StorageError};
use crate::resilience::retry::{RetryPolicy, RetryVerdict};

/// Counts for one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Rows present at the start of the pass
    pub attempted: usize,
    pub succeeded: usize,
    pub retried: usize,
    pub failed: usize,
}

impl ReplaySummary {
    /// Whether every attempted row was delivered.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.retried == 0 && self.failed == 0
    }
}

pub struct ReplayEngine {
    store: Arc<dyn MutationStore>,
    network: Arc<dyn Network>,
    hub: Arc<NotificationHub>,
    policy: RetryPolicy,
    pass_lock: Mutex<()>,
}

impl ReplayEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn MutationStore>,
        network: Arc<dyn Network>,
        hub: Arc<NotificationHub>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            network,
            hub,
            policy,
            pass_lock: Mutex::new(()),
        }
    }

    /// Run one replay pass.
    ///
    /// Storage errors abort the pass and propagate; rows already resolved
    /// stay resolved and the rest are retried on the next trigger.
    #[tracing::instrument(skip(self), fields(attempted))]
    pub async fn replay(&self) -> Result<ReplaySummary, StorageError> {
        let _pass = self.pass_lock.lock().await;
        let started = Instant::now();

        let scan = self.store.scan().await?;
        tracing::Span::current().record("attempted", scan.len());
        let mut summary = ReplaySummary {
            attempted: scan.len(),
            ..Default::default()
        };
        if scan.is_empty() {
            debug!("Replay pass found an empty queue");
            return Ok(summary);
        }

        info!(pending = scan.pending.len(), corrupt = scan.corrupt.len(), "Starting replay pass");
        for corrupt in &scan.corrupt {
            self.discard_corrupt(corrupt).await?;
            summary.failed += 1;
        }
        for mutation in &scan.pending {
            match self.replay_one(mutation).await? {
                RetryVerdict::Synced => summary.succeeded += 1,
                RetryVerdict::Retry { .. } => summary.retried += 1,
                RetryVerdict::Abandon { .. } => summary.failed += 1,
            }
        }

        crate::metrics::record_replay_pass(started.elapsed());
        crate::metrics::set_queue_pending(self.store.count().await?);
        info!(
            succeeded = summary.succeeded,
            retried = summary.retried,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Replay pass complete"
        );
        Ok(summary)
    }

    /// Wait for an in-flight pass, if any, to finish.
    pub async fn wait_idle(&self) {
        drop(self.pass_lock.lock().await);
    }

    async fn replay_one(&self, mutation: &PendingMutation) -> Result<RetryVerdict, StorageError> {
        let verdict = match mutation.to_request() {
            Ok(request) => {
                let result = self.network.fetch(&request).await;
                self.policy.verdict(&result, mutation.retry_count)
            }
            // Unparseable URL can never succeed
            Err(e) => RetryVerdict::Abandon {
                reason: format!("invalid URL: {}", e),
            },
        };

        match &verdict {
            RetryVerdict::Synced => {
                self.store.delete(mutation.id).await?;
                crate::metrics::record_replay_verdict("synced");
                debug!(id = mutation.id, url = %mutation.url, "Replayed mutation delivered");
                let delivered = self.hub.notify(&ReplayOutcome::success(&mutation.url));
                crate::metrics::record_notifications("sync-success", delivered);
            }
            RetryVerdict::Retry { next_retry_count } => {
                self.store
                    .update(mutation.id, MutationPatch::retry_count(*next_retry_count))
                    .await?;
                crate::metrics::record_replay_verdict("retry");
                debug!(
                    id = mutation.id,
                    url = %mutation.url,
                    retry_count = next_retry_count,
                    "Replay failed transiently, kept for next pass"
                );
            }
            RetryVerdict::Abandon { reason } => {
                self.store.delete(mutation.id).await?;
                crate::metrics::record_replay_verdict("abandoned");
                warn!(
                    id = mutation.id,
                    url = %mutation.url,
                    retry_count = mutation.retry_count,
                    reason = %reason,
                    "Dropping mutation after terminal replay failure"
                );
                let delivered = self.hub.notify(&ReplayOutcome::failed(&mutation.url, reason));
                crate::metrics::record_notifications("sync-failed", delivered);
            }
        }

        Ok(verdict)
    }

    /// A row that no longer decodes can never be replayed, so it is dropped
    /// and reported like any other terminal failure.
    async fn discard_corrupt(&self, corrupt: &CorruptMutation) -> Result<(), StorageError> {
        self.store.delete(corrupt.id).await?;
        crate::metrics::record_replay_verdict("abandoned");
        warn!(
            id = corrupt.id,
            url = %corrupt.url,
            reason = %corrupt.reason,
            "Dropping undecodable queue row"
        );
        let reason = format!("corrupt entry: {}", corrupt.reason);
        let delivered = self.hub.notify(&ReplayOutcome::failed(&corrupt.url, &reason));
        crate::metrics::record_notifications("sync-failed", delivered);
        Ok(())
    }
}
