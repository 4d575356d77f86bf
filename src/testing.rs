// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Scripted network stub and a failing store for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::network::{Network, NetworkError};
use crate::queue::{
    InMemoryMutationStore, MutationPatch, MutationStore, NewMutation, PendingMutation, StorageError,
};
use crate::request::{InterceptedRequest, ResponseSnapshot};

#[derive(Debug, Clone)]
pub(crate) enum StubReply {
    Status(u16, &'static str),
    Unreachable,
}

pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, StubReply>>,
    fallback: Mutex<StubReply>,
    requests: Mutex<Vec<InterceptedRequest>>,
}

impl StubNetwork {
    pub(crate) fn always(reply: StubReply) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            fallback: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn ok(body: &'static str) -> Self {
        Self::always(StubReply::Status(200, body))
    }

    pub(crate) fn unreachable() -> Self {
        Self::always(StubReply::Unreachable)
    }

    /// Reply for one exact URL, overriding the fallback.
    pub(crate) fn route(&self, url: &str, reply: StubReply) {
        self.routes.lock().insert(url.to_string(), reply);
    }

    pub(crate) fn set_fallback(&self, reply: StubReply) {
        *self.fallback.lock() = reply;
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn requests(&self) -> Vec<InterceptedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot, NetworkError> {
        self.requests.lock().push(request.clone());
        let reply = self
            .routes
            .lock()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| self.fallback.lock().clone());
        match reply {
            StubReply::Status(status, body) => Ok(ResponseSnapshot::new(status, body)),
            StubReply::Unreachable => Err(NetworkError::Transport("connection refused".into())),
        }
    }
}

/// In-memory store whose writes after enqueue can be made to fail.
pub(crate) struct FaultyStore {
    inner: InMemoryMutationStore,
    failing: AtomicBool,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryMutationStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    /// From now on `update` and `delete` return a backend error.
    pub(crate) fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk I/O error".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MutationStore for FaultyStore {
    async fn enqueue(&self, mutation: NewMutation) -> Result<i64, StorageError> {
        self.inner.enqueue(mutation).await
    }

    async fn list_all(&self) -> Result<Vec<PendingMutation>, StorageError> {
        self.inner.list_all().await
    }

    async fn update(&self, id: i64, patch: MutationPatch) -> Result<(), StorageError> {
        self.check()?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.check()?;
        self.inner.delete(id).await
    }
}
