// src/app.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use yieldwatch::application::{AdvisoryEngine, Aggregator, BroadcastScheduler, FeedHub};
use yieldwatch::domain::query::QueryEngine;
use yieldwatch::infrastructure::sources::{create_adapters, SubgraphAdapter, UpdateSource};
use yieldwatch::presentation::{create_router, AppState};
use yieldwatch::shared::config::{Config, FeedSourceKind};

pub async fn run(cfg: Config) -> Result<()> {
    if !cfg.server.socket_path.starts_with('/') {
        anyhow::bail!("server.socket_path must start with '/': {}", cfg.server.socket_path);
    }

    info!("🚀 Starting yieldwatch");
    info!("   Bind: {}", cfg.server.bind);
    info!("   Push feed: {} every {}s", cfg.server.socket_path, cfg.broadcast.interval_secs);

    let adapters = create_adapters(&cfg.sources).context("failed to create source adapters")?;
    if adapters.is_empty() {
        warn!("⚠️ No sources enabled, snapshots will only hold the placeholder entry");
    }
    let aggregator = Arc::new(Aggregator::new(adapters, cfg.aggregator.clone()));
    let advisor = Arc::new(AdvisoryEngine::from_config(cfg.advisory.clone()));
    let hub = Arc::new(FeedHub::new(
        cfg.broadcast.channel_capacity,
        cfg.broadcast.replay_on_connect,
    ));

    let scheduler = if cfg.broadcast.enabled {
        let source: Arc<dyn UpdateSource> = match cfg.broadcast.source {
            FeedSourceKind::Subgraph => Arc::new(
                SubgraphAdapter::new(cfg.sources.subgraph.clone())
                    .context("failed to create feed subgraph client")?,
            ),
            FeedSourceKind::Aggregate => aggregator.clone() as Arc<dyn UpdateSource>,
        };
        let period = Duration::from_secs(cfg.broadcast.interval_secs.max(1));
        Some(BroadcastScheduler::new(source, hub.clone(), period).start())
    } else {
        info!("Push feed scheduler disabled");
        None
    };

    let state = Arc::new(AppState::new(
        QueryEngine::new(cfg.query.clone()),
        aggregator,
        advisor,
        hub,
    ));
    let router = create_router(state, &cfg.server.socket_path);

    let listener = TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind))?;
    info!("✅ Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }
    info!("👋 Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
