// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fan-out of replay outcomes to connected application instances.
//!
//! Fire-and-forget: a message reaches whoever is subscribed at publish time.
//! Nothing is buffered for late subscribers. Subscribers whose receiver has
//! been dropped are pruned on the next publish.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::messages::{ReplayOutcome, SyncMessage};

/// Identifier of one connected application instance.
pub type ClientId = u64;

/// Receiving half handed to an application instance.
pub struct Subscription {
    id: ClientId,
    receiver: mpsc::UnboundedReceiver<SyncMessage>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Wait for the next message. `None` once the hub drops this client.
    pub async fn recv(&mut self) -> Option<SyncMessage> {
        self.receiver.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<SyncMessage> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything already delivered.
    pub fn drain(&mut self) -> Vec<SyncMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

#[derive(Default)]
pub struct NotificationHub {
    subscribers: DashMap<ClientId, mpsc::UnboundedSender<SyncMessage>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.insert(id, sender);
        debug!(client = id, "Client subscribed to sync notifications");
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: ClientId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Send one outcome to every live subscriber. Returns how many received it.
    pub fn notify(&self, outcome: &ReplayOutcome) -> usize {
        self.broadcast(SyncMessage::from(outcome))
    }

    pub fn broadcast(&self, message: SyncMessage) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*entry.key());
            }
        }

        // Removal after iteration; DashMap shards are still read-locked inside the loop
        for id in closed {
            self.subscribers.remove(&id);
            debug!(client = id, "Pruned disconnected client");
        }

        delivered
    }
}
