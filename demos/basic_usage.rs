// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic offline-relay usage example.
//!
//! Demonstrates:
//! 1. Precaching the app shell
//! 2. Serving tiles and pages through the relay
//! 3. Losing connectivity: navigation fallback, tile miss, queued mutations
//! 4. Reconnecting: ordered replay with client notifications
//! 5. Displaying metrics
//! 6. Clean shutdown
//!
//! No server is needed: a simulated network answers in-process and can be
//! switched off to mimic an outage.
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use offline_relay::{
    InterceptedRequest, Network, NetworkError, OfflineRelay, RelayConfig, ResponseSnapshot,
    SqliteMutationStore,
};

/// In-process stand-in for the real network.
struct SimulatedNetwork {
    up: AtomicBool,
}

#[async_trait]
impl Network for SimulatedNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot, NetworkError> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(NetworkError::Transport("simulated outage".into()));
        }
        let body = format!("{} {}", request.method, request.url);
        Ok(ResponseSnapshot::new(200, body))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           offline-relay: Basic Usage Example                  ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure, precache and start
    // ─────────────────────────────────────────────────────────────────────────
    let dir = tempfile::tempdir()?;
    let queue_path = dir.path().join("relay_queue.db");
    let config = RelayConfig {
        queue_path: queue_path.to_string_lossy().into_owned(),
        precache_urls: vec![
            "https://app.example/".into(),
            "https://app.example/offline.html".into(),
        ],
        ..Default::default()
    };

    let network = Arc::new(SimulatedNetwork { up: AtomicBool::new(true) });
    let store = Arc::new(SqliteMutationStore::new(&queue_path));
    let relay = OfflineRelay::with_parts(config, store, network.clone());
    println!("📦 State: {}", relay.state());

    let stored = relay.install().await;
    println!("   └─ Precached {} app-shell entries", stored);
    relay.start().await?;
    println!("   ✅ Relay ready! State: {}", relay.state());

    let mut client = relay.subscribe();

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Online traffic
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🌐 Online requests...");
    for url in [
        "https://tile.openstreetmap.org/12/2048/1361.png",
        "https://tile.openstreetmap.org/12/2048/1361.png",
        "https://app.example/map",
    ] {
        let response = relay.handle(InterceptedRequest::get(url)?).await?;
        println!("   └─ GET {} → {} ({:?})", url, response.status, response.source);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Outage
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📴 Going offline...");
    network.up.store(false, Ordering::SeqCst);
    relay.set_online(false).await?;

    let page = relay
        .handle(InterceptedRequest::get("https://app.example/settings")?.navigate())
        .await?;
    println!("   └─ Navigate /settings → {} ({:?})", page.status, page.source);

    let tile = relay
        .handle(InterceptedRequest::get("https://tile.openstreetmap.org/12/2049/1361.png")?)
        .await?;
    println!("   └─ Uncached tile → {} {}", tile.status, tile.status_text);

    for (n, path) in ["/reports", "/verify/17"].iter().enumerate() {
        let request = InterceptedRequest::parse("POST", &format!("https://api.example{path}"))?
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"n":{n}}}"#));
        let response = relay.handle(request).await?;
        println!(
            "   └─ POST {} → {} {}",
            path,
            response.status,
            String::from_utf8_lossy(&response.body)
        );
    }
    println!("   📋 Status: {:?}", relay.status().await?);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Reconnect
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📶 Back online...");
    network.up.store(true, Ordering::SeqCst);
    if let Some(summary) = relay.set_online(true).await? {
        println!("   └─ Replay: {:?}", summary);
    }
    for message in client.drain() {
        println!("   └─ Client got: {}", serde_json::to_string(&message)?);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Metrics:");
    dump_metrics(&snapshotter);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Shutdown
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🛑 Shutting down...");
    relay.shutdown().await;
    println!("   ✅ Shutdown complete! State: {}", relay.state());

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Print every captured metric, sorted by name
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut lines: Vec<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, value)| {
            let (_, key) = composite_key.into_parts();
            let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
            let label_str = if labels.is_empty() {
                String::new()
            } else {
                format!("{{{}}}", labels.join(","))
            };
            let rendered = match value {
                DebugValue::Counter(v) => v.to_string(),
                DebugValue::Gauge(v) => format!("{:.2}", v.into_inner()),
                DebugValue::Histogram(samples) => {
                    let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                    format!("count={} sum={:.4}", samples.len(), sum)
                }
            };
            format!("{}{} = {}", key.name(), label_str, rendered)
        })
        .collect();
    lines.sort();

    if lines.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
    for line in lines {
        println!("   └─ {}", line);
    }
}
