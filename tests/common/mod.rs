//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use offline_relay::{
    InterceptedRequest, Network, NetworkError, OfflineRelay, RelayConfig, ResponseSnapshot,
    SqliteMutationStore,
};

/// Scripted reply for one URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    Down,
}

/// Network double: per-URL replies, a default, and a request log.
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Reply>>,
    default: Mutex<Reply>,
    log: Mutex<Vec<InterceptedRequest>>,
}

impl ScriptedNetwork {
    pub fn new(default: Reply) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            default: Mutex::new(default),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn route(&self, url: &str, reply: Reply) {
        self.routes.lock().insert(url.to_string(), reply);
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default.lock() = reply;
    }

    pub fn calls(&self) -> usize {
        self.log.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.log.lock().iter().filter(|r| r.url.as_str() == url).count()
    }

    pub fn log(&self) -> Vec<InterceptedRequest> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot, NetworkError> {
        self.log.lock().push(request.clone());
        let reply = self
            .routes
            .lock()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| self.default.lock().clone());
        match reply {
            Reply::Status(status, body) => Ok(ResponseSnapshot::new(status, body)),
            Reply::Down => Err(NetworkError::Transport("network unreachable".into())),
        }
    }
}

/// Relay backed by a SQLite queue in its own temp directory.
pub struct Harness {
    pub relay: OfflineRelay,
    pub network: Arc<ScriptedNetwork>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(network: Arc<ScriptedNetwork>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::in_dir(dir, network, RelayConfig::default())
    }

    pub fn with_config(network: Arc<ScriptedNetwork>, config: RelayConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::in_dir(dir, network, config)
    }

    /// Reuse `dir`, simulating a restart over the same queue file.
    pub fn in_dir(dir: TempDir, network: Arc<ScriptedNetwork>, mut config: RelayConfig) -> Self {
        let path = dir.path().join("queue.db");
        config.queue_path = path.to_string_lossy().into_owned();
        let store = Arc::new(SqliteMutationStore::new(&path));
        let relay = OfflineRelay::with_parts(config, store, network.clone());
        Self { relay, network, dir }
    }

    pub fn queue_path(&self) -> std::path::PathBuf {
        self.dir.path().join("queue.db")
    }
}

pub fn post(url: &str, body: &'static str) -> InterceptedRequest {
    InterceptedRequest::parse("POST", url)
        .unwrap()
        .with_header("content-type", "application/json")
        .with_body(body)
}

pub fn get(url: &str) -> InterceptedRequest {
    InterceptedRequest::get(url).unwrap()
}
