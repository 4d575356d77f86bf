// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded response caches.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Cache Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  namespace.rs  - BoundedCache: ordered entries, FIFO trim    │
//! │  manager.rs    - CacheManager: app-shell + tile namespaces   │
//! │  strategy.rs   - cache_first (tiles), network_first (shell)  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! After every write `len(namespace) <= max_entries`. Eviction order is
//! insertion order, not access order.

pub mod namespace;
pub mod manager;
pub mod strategy;

pub use namespace::{BoundedCache, CacheNamespace};
pub use manager::{CacheKind, CacheManager};
pub use strategy::{cache_first, network_first};
