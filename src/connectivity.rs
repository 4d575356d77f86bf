// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Online/offline flag as reported by the hosting runtime.
//!
//! Backed by `watch` channels so the coordinator's run loop can react to
//! offline → online edges without polling. Watch values coalesce, so edges
//! are published as a monotonically increasing reconnect counter rather
//! than inferred from the flag.

use tokio::sync::watch;

pub struct Connectivity {
    online: watch::Sender<bool>,
    reconnects: watch::Sender<u64>,
}

impl Connectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (online, _) = watch::channel(online);
        let (reconnects, _) = watch::channel(0);
        Self { online, reconnects }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Record the current state. Returns `true` if this was an offline → online edge.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.online.send_replace(online);
        let restored = online && !was_online;
        if restored {
            self.reconnects.send_modify(|n| *n += 1);
        }
        restored
    }

    /// Number of offline → online edges seen so far.
    #[must_use]
    pub fn reconnects(&self) -> u64 {
        *self.reconnects.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Notified once per batch of reconnects.
    #[must_use]
    pub fn subscribe_reconnects(&self) -> watch::Receiver<u64> {
        self.reconnects.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}
