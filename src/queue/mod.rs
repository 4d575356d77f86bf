// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable queue of mutations captured while offline.
//!
//! The router only ever calls [`MutationStore::enqueue`]; the replay engine
//! owns every read, update and delete.

pub mod traits;
pub mod sqlite;
pub mod memory;

pub use traits::{
    CorruptMutation, MutationPatch, MutationStore, NewMutation, PendingMutation, QueueScan,
    StorageError,
};
pub use sqlite::SqliteMutationStore;
pub use memory::InMemoryMutationStore;
