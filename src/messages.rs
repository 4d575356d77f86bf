// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Messages exchanged with running application instances.
//!
//! Wire shapes are JSON objects discriminated by `type`:
//!
//! ```text
//! app → relay   {"type":"process-offline-queue"}
//!               {"type":"get-queue-status"}
//! relay → app   {"type":"sync-success","url":"...","message":"..."}
//!               {"type":"sync-failed","url":"...","message":"..."}
//!               {"type":"queue-status","pending":3,"online":true}
//! ```

use serde::{Deserialize, Serialize};

/// Background-sync tag that triggers a replay pass.
pub const OFFLINE_QUEUE_SYNC: &str = "offline-queue-sync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    ProcessOfflineQueue,
    GetQueueStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    SyncSuccess { url: String, message: String },
    SyncFailed { url: String, message: String },
    QueueStatus { pending: u64, online: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Failed,
}

/// Terminal result of replaying one queued mutation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub kind: OutcomeKind,
    pub url: String,
    pub message: String,
}

impl ReplayOutcome {
    #[must_use]
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Success,
            url: url.into(),
            message: "Offline change synced".to_string(),
        }
    }

    #[must_use]
    pub fn failed(url: impl Into<String>, reason: &str) -> Self {
        Self {
            kind: OutcomeKind::Failed,
            url: url.into(),
            message: format!("Sync failed: {}", reason),
        }
    }
}

impl From<&ReplayOutcome> for SyncMessage {
    fn from(outcome: &ReplayOutcome) -> Self {
        let url = outcome.url.clone();
        let message = outcome.message.clone();
        match outcome.kind {
            OutcomeKind::Success => SyncMessage::SyncSuccess { url, message },
            OutcomeKind::Failed => SyncMessage::SyncFailed { url, message },
        }
    }
}
