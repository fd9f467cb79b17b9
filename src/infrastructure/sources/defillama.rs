use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::SourceAdapter;
use crate::shared::config::DefiLlamaCfg;
use crate::shared::errors::SourceError;
use crate::shared::types::{Pool, RiskLabel};

/// Response of `GET /pools`
#[derive(Debug, Deserialize)]
struct PoolsResponse {
    data: Vec<serde_json::Value>,
}

/// One upstream record. Everything optional; required fields are checked in `normalize`.
#[derive(Debug, Deserialize)]
struct RawPool {
    chain: Option<String>,
    project: Option<String>,
    symbol: Option<String>,
    #[serde(rename = "tvlUsd")]
    tvl_usd: Option<f64>,
    apy: Option<f64>,
    #[serde(rename = "apyBase")]
    apy_base: Option<f64>,
    #[serde(rename = "apyReward")]
    apy_reward: Option<f64>,
    pool: Option<String>,
    #[serde(rename = "ilRisk")]
    il_risk: Option<String>,
}

/// Bulk yields feed (yields.llama.fi)
pub struct DefiLlamaAdapter {
    http_client: Client,
    url: String,
}

impl DefiLlamaAdapter {
    pub fn new(cfg: DefiLlamaCfg) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            url: cfg.url,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize(raw: RawPool) -> Option<Pool> {
    Some(Pool {
        protocol: non_blank(raw.project)?,
        symbol: non_blank(raw.symbol)?,
        apy: raw.apy.unwrap_or(0.0),
        apy_base: raw.apy_base.unwrap_or(0.0),
        apy_reward: raw.apy_reward.unwrap_or(0.0),
        tvl: raw.tvl_usd.unwrap_or(0.0),
        chain: non_blank(raw.chain)?,
        risk: RiskLabel::from_il_flag(raw.il_risk.as_deref()),
        pool_id: non_blank(raw.pool)?,
    })
}

/// Map every record that passes the shape check; the rest are dropped
fn normalize_all(records: Vec<serde_json::Value>) -> Vec<Pool> {
    let total = records.len();
    let pools: Vec<Pool> = records
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawPool>(value).ok())
        .filter_map(normalize)
        .collect();

    if pools.len() < total {
        debug!(dropped = total - pools.len(), "Dropped malformed DefiLlama records");
    }
    pools
}

#[async_trait]
impl SourceAdapter for DefiLlamaAdapter {
    fn name(&self) -> &str {
        "defillama"
    }

    async fn try_fetch(&self) -> Result<Vec<Pool>, SourceError> {
        info!("🔍 Fetching DefiLlama pools from: {}", self.url);

        let response = self.http_client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body: PoolsResponse = response.json().await?;
        Ok(normalize_all(body.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_maps_fields() {
        let records = vec![json!({
            "chain": "Ethereum",
            "project": "aave-v3",
            "symbol": "USDC",
            "tvlUsd": 1500000.0,
            "apy": 4.5,
            "apyBase": 4.0,
            "apyReward": null,
            "pool": "aa70268e-4b52-42bf-a116-608b370f9501",
            "stablecoin": true,
            "ilRisk": "no"
        })];

        let pools = normalize_all(records);
        assert_eq!(pools.len(), 1);
        let pool = &pools[0];
        assert_eq!(pool.protocol, "aave-v3");
        assert_eq!(pool.tvl, 1_500_000.0);
        assert_eq!(pool.apy_base, 4.0);
        assert_eq!(pool.apy_reward, 0.0);
        assert_eq!(pool.risk, RiskLabel::LowLendingStaking);
        assert_eq!(pool.pool_id, "aa70268e-4b52-42bf-a116-608b370f9501");
    }

    #[test]
    fn test_il_risk_yes_is_high() {
        let pools = normalize_all(vec![json!({
            "chain": "Base", "project": "aerodrome-v1", "symbol": "USDC-USDT",
            "tvlUsd": 10.0, "apy": 20.0, "pool": "p1", "ilRisk": "yes"
        })]);
        assert_eq!(pools[0].risk, RiskLabel::HighImpermanentLoss);
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let pools = normalize_all(vec![
            json!({"chain": "Base", "project": "x", "symbol": "USDC", "pool": "ok"}),
            json!({"chain": "Base", "project": "x", "symbol": "USDC"}),
            json!({"chain": "Base", "project": "x", "symbol": "USDC", "pool": "p", "apy": "high"}),
            json!("not an object"),
        ]);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].pool_id, "ok");
        assert_eq!(pools[0].apy, 0.0);
    }
}
