// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Process-local mutation store.
//!
//! Not crash-durable. Useful for tests and for embedding the relay where
//! losing the queue on restart is acceptable.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::traits::{MutationPatch, MutationStore, NewMutation, PendingMutation, StorageError};

#[derive(Default)]
struct MemoryQueue {
    next_id: i64,
    rows: BTreeMap<i64, PendingMutation>,
}

#[derive(Default)]
pub struct InMemoryMutationStore {
    queue: Mutex<MemoryQueue>,
}

impl InMemoryMutationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().rows.is_empty()
    }
}

#[async_trait]
impl MutationStore for InMemoryMutationStore {
    async fn enqueue(&self, mutation: NewMutation) -> Result<i64, StorageError> {
        let mut queue = self.queue.lock();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.rows.insert(
            id,
            PendingMutation {
                id,
                url: mutation.url,
                method: mutation.method,
                headers: mutation.headers,
                body: mutation.body,
                enqueued_at: mutation.enqueued_at,
                retry_count: 0,
            },
        );
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<PendingMutation>, StorageError> {
        Ok(self.queue.lock().rows.values().cloned().collect())
    }

    async fn update(&self, id: i64, patch: MutationPatch) -> Result<(), StorageError> {
        let mut queue = self.queue.lock();
        let row = queue.rows.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        if let Some(retry_count) = patch.retry_count {
            row.retry_count = retry_count;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.queue.lock().rows.remove(&id);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.len() as u64)
    }
}
