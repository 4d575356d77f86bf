// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

use crate::request::InterceptedRequest;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Pending mutation {0} not found")]
    NotFound(i64),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Corrupt pending mutation {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// A mutating request captured while offline, awaiting replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Store-assigned, monotonically increasing
    pub id: i64,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Epoch millis at enqueue time
    pub enqueued_at: i64,
    pub retry_count: u32,
}

impl PendingMutation {
    /// Rebuild the original request for replay.
    pub fn to_request(&self) -> Result<InterceptedRequest, url::ParseError> {
        let mut request = InterceptedRequest::new(self.method.clone(), Url::parse(&self.url)?);
        request.headers = self.headers.clone();
        request.body = self.body.clone();
        Ok(request)
    }
}

/// Input to [`MutationStore::enqueue`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMutation {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub enqueued_at: i64,
}

impl NewMutation {
    #[must_use]
    pub fn from_request(request: &InterceptedRequest) -> Self {
        Self {
            url: request.url.to_string(),
            method: request.method.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            enqueued_at: now_millis(),
        }
    }
}

/// Partial update applied by [`MutationStore::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationPatch {
    pub retry_count: Option<u32>,
}

impl MutationPatch {
    #[must_use]
    pub fn retry_count(retry_count: u32) -> Self {
        Self {
            retry_count: Some(retry_count),
        }
    }
}

/// A stored row that can no longer be decoded into a [`PendingMutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptMutation {
    pub id: i64,
    /// Empty when the URL column itself is unreadable
    pub url: String,
    pub reason: String,
}

/// Full view of the queue: decodable rows in enqueue order plus rows
/// that replay must discard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueScan {
    pub pending: Vec<PendingMutation>,
    pub corrupt: Vec<CorruptMutation>,
}

impl QueueScan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + self.corrupt.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.corrupt.is_empty()
    }
}

/// Durable log of pending mutations.
///
/// Once `enqueue` returns `Ok`, the row must survive a restart until
/// `delete` is called for it. Errors are never swallowed.
#[async_trait]
pub trait MutationStore: Send + Sync {
    async fn enqueue(&self, mutation: NewMutation) -> Result<i64, StorageError>;

    /// All decodable pending rows in enqueue order.
    async fn list_all(&self) -> Result<Vec<PendingMutation>, StorageError>;

    /// Returns [`StorageError::NotFound`] if `id` is not pending.
    async fn update(&self, id: i64, patch: MutationPatch) -> Result<(), StorageError>;

    /// Deleting an id that is already gone is not an error.
    async fn delete(&self, id: i64) -> Result<(), StorageError>;

    /// Like [`list_all`](Self::list_all), but reports undecodable rows
    /// instead of hiding them. Stores that cannot hold corrupt rows keep the default.
    async fn scan(&self) -> Result<QueueScan, StorageError> {
        Ok(QueueScan {
            pending: self.list_all().await?,
            corrupt: Vec::new(),
        })
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.list_all().await?.len() as u64)
    }

    /// Release backend resources. Pending rows stay durable.
    async fn close(&self) {}
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
