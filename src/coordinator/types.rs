// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the relay coordinator.

/// Relay lifecycle state.
///
/// Use [`super::OfflineRelay::state()`] to check the current state or
/// [`super::OfflineRelay::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Just created, nothing fetched yet
    Created,
    /// Precaching the app shell
    Installing,
    /// Precache done, requests can be served
    Ready,
    /// Background run loop active
    Running,
    /// Graceful shutdown in progress
    ShuttingDown,
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Installing => write!(f, "Installing"),
            Self::Ready => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

/// Point-in-time snapshot returned by [`super::OfflineRelay::status()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStatus {
    pub online: bool,
    /// Mutations waiting for replay
    pub pending: u64,
    pub app_entries: usize,
    pub tile_entries: usize,
    pub subscribers: usize,
}
