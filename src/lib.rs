//! # Offline Relay
//!
//! A request interceptor that keeps a web application usable without
//! connectivity: cached app shell and map tiles, a crash-durable queue of
//! mutations captured while offline, and ordered replay once the network
//! comes back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Policy Router                         │
//! │  • One disposition per intercepted request                 │
//! │  • enqueue | pass-through | tile cache | app cache         │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐
//! │  Tile Cache     │  │  App Cache      │  │  Mutation Queue │
//! │  cache-first    │  │  network-first  │  │  SQLite, WAL    │
//! │  FIFO, 500 max  │  │  FIFO, 60 max   │  │  enqueue order  │
//! └─────────────────┘  └─────────────────┘  └─────────────────┘
//!                                                     │
//!                              (connectivity restored / sync event)
//!                                                     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Replay Engine                          │
//! │  • Sequential, in enqueue order, one pass at a time        │
//! │  • 2xx → delete · 5xx/network → retry · else → drop        │
//! │  • Outcomes fanned out to subscribed clients               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use offline_relay::{InterceptedRequest, OfflineRelay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig {
//!         queue_path: "./relay_queue.db".into(),
//!         precache_urls: vec!["https://app.example/offline.html".into()],
//!         ..Default::default()
//!     };
//!     let relay = OfflineRelay::new(config)?;
//!     relay.install().await;
//!     relay.start().await?;
//!
//!     let mut client = relay.subscribe();
//!
//!     // Runtime lost the network: allow-listed mutations are captured
//!     relay.set_online(false).await?;
//!     let request = InterceptedRequest::parse("POST", "https://api.example/reports")?
//!         .with_header("content-type", "application/json")
//!         .with_body(r#"{"kind":"pothole"}"#);
//!     assert_eq!(relay.handle(request).await?.status, 202);
//!
//!     // Back online: the queue replays and the client hears about it
//!     relay.set_online(true).await?;
//!     if let Some(message) = client.try_recv() {
//!         println!("{message:?}");
//!     }
//!
//!     relay.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: [`OfflineRelay`], wiring and lifecycle
//! - [`router`]: request classification and dispatch
//! - [`cache`]: bounded namespaces and fetch strategies
//! - [`queue`]: durable mutation store (SQLite, in-memory)
//! - [`replay`]: queue drain and retry verdicts
//! - [`notify`]: client subscriptions and fan-out
//! - [`resilience`]: retry rule, backoff when opening the store

pub mod config;
pub mod request;
pub mod cache;
pub mod queue;
pub mod network;
pub mod connectivity;
pub mod router;
pub mod replay;
pub mod notify;
pub mod messages;
pub mod coordinator;
pub mod resilience;
pub mod metrics;
pub mod error;

#[cfg(test)]
mod testing;

pub use config::{RelayConfig, ConfigError};
pub use request::{InterceptedRequest, RequestIdentity, RequestMode, ResponseSnapshot, ResponseSource};
pub use cache::{BoundedCache, CacheKind, CacheManager, CacheNamespace};
pub use queue::{
    CorruptMutation, InMemoryMutationStore, MutationPatch, MutationStore, NewMutation,
    PendingMutation, QueueScan, SqliteMutationStore, StorageError,
};
pub use network::{HttpNetwork, Network, NetworkError};
pub use connectivity::Connectivity;
pub use router::{Disposition, PolicyRouter, RoutingPolicy};
pub use replay::{ReplayEngine, ReplaySummary};
pub use notify::{ClientId, NotificationHub, Subscription};
pub use messages::{ClientMessage, OutcomeKind, ReplayOutcome, SyncMessage, OFFLINE_QUEUE_SYNC};
pub use coordinator::{OfflineRelay, RelayState, RelayStatus};
pub use resilience::retry::{RetryPolicy, RetryVerdict};
pub use resilience::backoff::BackoffConfig;
pub use error::RelayError;
