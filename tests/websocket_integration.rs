//! WebSocket push feed integration tests
//!
//! Starts a real server with a running scheduler and reads frames with a
//! tungstenite client.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use yieldwatch::{
    application::{AdvisoryEngine, Aggregator, BroadcastScheduler, FeedHub, SchedulerHandle},
    domain::query::QueryEngine,
    infrastructure::sources::UpdateSource,
    presentation::{AppState, create_router},
    shared::{
        config::{AdvisoryCfg, AggregatorCfg, QueryCfg},
        types::YieldUpdate,
    },
};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Reports a rising USDC rate on every call
struct TickingSource {
    calls: AtomicU64,
}

#[async_trait]
impl UpdateSource for TickingSource {
    async fn fetch_updates(&self) -> Vec<YieldUpdate> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        vec![
            YieldUpdate {
                symbol: "USDC".to_string(),
                name: "USD Coin".to_string(),
                apy: 4.0 + n as f64 / 100.0,
                tvl: 1.5e9,
                timestamp: Utc::now(),
            },
            YieldUpdate {
                symbol: "USDT".to_string(),
                name: "Tether USD".to_string(),
                apy: 3.2,
                tvl: 9.0e8,
                timestamp: Utc::now(),
            },
        ]
    }
}

/// Start a test server and return its address
async fn start_test_server(
    replay: bool,
    period: Duration,
) -> (SocketAddr, Arc<FeedHub>, SchedulerHandle) {
    let hub = Arc::new(FeedHub::new(16, replay));
    let state = Arc::new(AppState::new(
        QueryEngine::new(QueryCfg::default()),
        Arc::new(Aggregator::new(Vec::new(), AggregatorCfg::default())),
        Arc::new(AdvisoryEngine::new(None, AdvisoryCfg::default())),
        hub.clone(),
    ));
    let app = create_router(state, "/api/socket");

    let source = Arc::new(TickingSource {
        calls: AtomicU64::new(0),
    });
    let scheduler = BroadcastScheduler::new(source, hub.clone(), period).start();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, hub, scheduler)
}

async fn next_frame<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

// ============================================================================
// Push Feed Tests
// ============================================================================

#[tokio::test]
async fn test_receives_yield_updates() {
    let (addr, _hub, scheduler) = start_test_server(false, Duration::from_millis(100)).await;

    let url = format!("ws://{}/api/socket", addr);
    let (mut ws, _response) = connect_async(&url).await.expect("Failed to connect");

    let first = next_frame(&mut ws).await;
    assert_eq!(first["event"], "yield-update");
    let data = first["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["symbol"], "USDC");
    assert_eq!(data[0]["name"], "USD Coin");
    assert!(data[0]["timestamp"].is_string());

    let second = next_frame(&mut ws).await;
    assert!(second["sequence"].as_u64().unwrap() > first["sequence"].as_u64().unwrap());

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_replays_last_event_on_connect() {
    let (addr, hub, scheduler) = start_test_server(true, Duration::from_secs(60)).await;

    // first tick fires immediately; the next one is a minute away
    while hub.last_sequence().await.is_none() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let url = format!("ws://{}/api/socket", addr);
    let (mut ws, _response) = connect_async(&url).await.expect("Failed to connect");

    let frame = next_frame(&mut ws).await;
    assert_eq!(frame["event"], "yield-update");
    assert_eq!(frame["sequence"], 1);

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_multiple_clients_receive_same_sequence() {
    let (addr, _hub, scheduler) = start_test_server(false, Duration::from_millis(150)).await;
    let url = format!("ws://{}/api/socket", addr);

    let (mut a, _) = connect_async(&url).await.expect("Failed to connect");
    let (mut b, _) = connect_async(&url).await.expect("Failed to connect");

    let frame_a = next_frame(&mut a).await;
    let mut frame_b = next_frame(&mut b).await;
    // b may have connected just after a tick that a caught
    while frame_b["sequence"].as_u64() < frame_a["sequence"].as_u64() {
        frame_b = next_frame(&mut b).await;
    }
    let mut frame_a = frame_a;
    while frame_a["sequence"].as_u64() < frame_b["sequence"].as_u64() {
        frame_a = next_frame(&mut a).await;
    }
    assert_eq!(frame_a["sequence"], frame_b["sequence"]);
    assert_eq!(frame_a["data"], frame_b["data"]);

    scheduler.shutdown().await;
}
