// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

use crate::config::ConfigError;
use crate::network::NetworkError;
use crate::queue::StorageError;

/// Top-level error returned by [`OfflineRelay`](crate::OfflineRelay) operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The mutation queue could not be read or written. Never swallowed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A pass-through request got no response.
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
