//! Fan-out over every source adapter into one snapshot

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::infrastructure::sources::{SourceAdapter, UpdateSource};
use crate::shared::config::{AggregatorCfg, DedupPolicy};
use crate::shared::errors::SourceError;
use crate::shared::types::{Pool, RiskLabel, Snapshot, YieldUpdate};

/// Synthetic entry injected when no source reports the placeholder symbol
pub fn placeholder_pool(symbol: &str) -> Pool {
    Pool {
        protocol: "ethena".to_string(),
        symbol: symbol.to_string(),
        apy: 15.4,
        apy_base: 10.0,
        apy_reward: 5.4,
        tvl: 5_000_000.0,
        chain: "Ethereum".to_string(),
        risk: RiskLabel::Medium,
        pool_id: format!("mock-{}-pool", symbol.to_lowercase()),
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    cfg: AggregatorCfg,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, cfg: AggregatorCfg) -> Self {
        Self { adapters, cfg }
    }

    pub fn config(&self) -> &AggregatorCfg {
        &self.cfg
    }

    /// Query every adapter concurrently and merge in registration order.
    /// A slow or failing adapter contributes nothing.
    pub async fn build_snapshot(&self) -> Snapshot {
        let limit = Duration::from_millis(self.cfg.source_timeout_ms);

        let fetches = self.adapters.iter().map(|adapter| async move {
            match timeout(limit, adapter.fetch()).await {
                Ok(pools) => pools,
                Err(_) => {
                    let err = SourceError::Timeout(limit);
                    warn!(
                        source = adapter.name(),
                        error = %err,
                        "⏱️ Source dropped from snapshot"
                    );
                    Vec::new()
                }
            }
        });

        let pools: Vec<Pool> = join_all(fetches).await.into_iter().flatten().collect();
        let fetched = pools.len();

        let mut pools = match self.cfg.dedup {
            DedupPolicy::KeepAll => pools,
            DedupPolicy::FirstWins => dedup_first_wins(pools),
        };
        if pools.len() != fetched {
            debug!(dropped = fetched - pools.len(), "Duplicate records dropped");
        }

        let symbol = &self.cfg.placeholder_symbol;
        if self.cfg.inject_placeholder && !pools.iter().any(|p| p.has_symbol(symbol)) {
            pools.push(placeholder_pool(symbol));
        }

        info!(pools = pools.len(), sources = self.adapters.len(), "📊 Snapshot built");
        Snapshot::new(pools)
    }
}

fn dedup_first_wins(pools: Vec<Pool>) -> Vec<Pool> {
    let mut seen = HashSet::new();
    pools
        .into_iter()
        .filter(|p| {
            seen.insert((
                p.protocol.to_lowercase(),
                p.symbol.to_lowercase(),
                p.chain.to_lowercase(),
            ))
        })
        .collect()
}

#[async_trait]
impl UpdateSource for Aggregator {
    async fn fetch_updates(&self) -> Vec<YieldUpdate> {
        self.build_snapshot()
            .await
            .pools()
            .iter()
            .map(YieldUpdate::from)
            .collect()
    }
}
