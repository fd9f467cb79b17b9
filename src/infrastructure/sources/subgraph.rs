use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{info, warn};

use super::{SourceAdapter, UpdateSource};
use crate::shared::config::{RateUnit, SubgraphCfg, GRAPH_API_KEY_ENV};
use crate::shared::errors::SourceError;
use crate::shared::types::{Pool, RiskLabel, YieldUpdate};
use crate::shared::utils::parse_decimal;

const LENDER_SIDE: &str = "LENDER";
const RAY: f64 = 1e27;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<GraphData>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct GraphData {
    markets: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    #[serde(default)]
    id: String,
    #[serde(rename = "inputToken")]
    input_token: RawToken,
    #[serde(default)]
    rates: Vec<RawRate>,
    #[serde(rename = "totalValueLockedUSD", default, deserialize_with = "de_decimal")]
    total_value_locked_usd: f64,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    symbol: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRate {
    #[serde(default, deserialize_with = "de_decimal")]
    rate: f64,
    side: String,
}

/// GraphQL BigDecimal arrives as a string; accept plain numbers too
fn de_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_decimal(&s),
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Lending-protocol subgraph behind The Graph gateway
pub struct SubgraphAdapter {
    http_client: Client,
    cfg: SubgraphCfg,
    query: String,
}

impl SubgraphAdapter {
    pub fn new(cfg: SubgraphCfg) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if cfg.api_key.is_none() {
            warn!(
                "⚠️ {} not set, subgraph source will return no data",
                GRAPH_API_KEY_ENV
            );
        }

        let query = build_query(&cfg.assets);
        Ok(Self {
            http_client,
            cfg,
            query,
        })
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/{}/subgraphs/id/{}",
            self.cfg.gateway_url.trim_end_matches('/'),
            api_key,
            self.cfg.subgraph_id
        )
    }

    async fn fetch_markets(&self) -> Result<Vec<RawMarket>, SourceError> {
        let api_key = self
            .cfg
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::CredentialMissing(GRAPH_API_KEY_ENV.to_string()))?;

        info!(
            "🔍 Querying {} subgraph for {} assets",
            self.cfg.protocol,
            self.cfg.assets.len()
        );

        let response = self
            .http_client
            .post(self.endpoint(api_key))
            .json(&serde_json::json!({ "query": self.query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body: GraphResponse = response.json().await?;
        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            return Err(SourceError::Unavailable(format!(
                "GraphQL errors: {}",
                serde_json::Value::Array(errors)
            )));
        }

        body.data
            .map(|d| d.markets)
            .ok_or_else(|| {
                SourceError::Malformed("response has neither data nor errors".to_string())
            })
    }

    /// Supply-side rate in percent
    fn supply_rate(&self, market: &RawMarket) -> f64 {
        let rate = market
            .rates
            .iter()
            .find(|r| r.side.eq_ignore_ascii_case(LENDER_SIDE))
            .map(|r| r.rate)
            .unwrap_or(0.0);

        match self.cfg.rate_unit {
            RateUnit::Percent => rate,
            RateUnit::Ray => rate / RAY * 100.0,
        }
    }

    fn to_pool(&self, market: &RawMarket) -> Pool {
        let apy = self.supply_rate(market);
        let pool_id = if market.id.is_empty() {
            format!("{}-{}", self.cfg.protocol, market.input_token.symbol.to_lowercase())
        } else {
            market.id.clone()
        };

        Pool {
            protocol: self.cfg.protocol.clone(),
            symbol: market.input_token.symbol.clone(),
            apy,
            apy_base: apy,
            apy_reward: 0.0,
            tvl: market.total_value_locked_usd,
            chain: self.cfg.chain.clone(),
            risk: RiskLabel::LowLending,
            pool_id,
        }
    }

    fn to_update(&self, market: &RawMarket) -> YieldUpdate {
        YieldUpdate {
            symbol: market.input_token.symbol.clone(),
            name: market.input_token.name.clone(),
            apy: self.supply_rate(market),
            tvl: market.total_value_locked_usd,
            timestamp: Utc::now(),
        }
    }
}

fn build_query(assets: &[String]) -> String {
    let assets = serde_json::to_string(assets).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"{{
  markets(where: {{ inputToken_in: {assets} }}) {{
    id
    inputToken {{ symbol name decimals }}
    rates {{ rate side }}
    totalValueLockedUSD
  }}
}}"#
    )
}

#[async_trait]
impl SourceAdapter for SubgraphAdapter {
    fn name(&self) -> &str {
        "subgraph"
    }

    async fn try_fetch(&self) -> Result<Vec<Pool>, SourceError> {
        let markets = self.fetch_markets().await?;
        Ok(markets.iter().map(|m| self.to_pool(m)).collect())
    }
}

#[async_trait]
impl UpdateSource for SubgraphAdapter {
    async fn fetch_updates(&self) -> Vec<YieldUpdate> {
        match self.fetch_markets().await {
            Ok(markets) => markets.iter().map(|m| self.to_update(m)).collect(),
            Err(SourceError::CredentialMissing(_)) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "⚠️ Subgraph feed fetch failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter(rate_unit: RateUnit) -> SubgraphAdapter {
        SubgraphAdapter::new(SubgraphCfg {
            rate_unit,
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn market() -> RawMarket {
        serde_json::from_value(json!({
            "id": "0x98c23e9d8f34fefb1b7bd6a91b7ff122f4e16f5c",
            "inputToken": { "symbol": "USDC", "name": "USD Coin", "decimals": 6 },
            "rates": [
                { "rate": "6.12", "side": "BORROWER" },
                { "rate": "4.53", "side": "LENDER" }
            ],
            "totalValueLockedUSD": "2450000000.5"
        }))
        .unwrap()
    }

    #[test]
    fn test_query_lists_assets() {
        let query = build_query(&SubgraphCfg::default().assets);
        assert!(query.contains("inputToken_in: [\"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48\""));
        assert!(query.contains("totalValueLockedUSD"));
    }

    #[test]
    fn test_supply_rate_picks_lender_side() {
        let pool = adapter(RateUnit::Percent).to_pool(&market());
        assert_eq!(pool.apy, 4.53);
        assert_eq!(pool.protocol, "aave-v3");
        assert_eq!(pool.risk, RiskLabel::LowLending);
        assert_eq!(pool.tvl, 2_450_000_000.5);
        assert_eq!(pool.pool_id, "0x98c23e9d8f34fefb1b7bd6a91b7ff122f4e16f5c");
    }

    #[test]
    fn test_ray_rate_is_converted() {
        let mut m = market();
        m.rates = vec![RawRate {
            rate: 0.0453 * RAY,
            side: "LENDER".to_string(),
        }];
        let pool = adapter(RateUnit::Ray).to_pool(&m);
        assert!((pool.apy - 4.53).abs() < 1e-9);
    }

    #[test]
    fn test_missing_lender_rate_is_zero() {
        let mut m = market();
        m.rates.retain(|r| r.side != "LENDER");
        assert_eq!(adapter(RateUnit::Percent).to_pool(&m).apy, 0.0);
    }

    #[test]
    fn test_update_record_shape() {
        let update = adapter(RateUnit::Percent).to_update(&market());
        assert_eq!(update.symbol, "USDC");
        assert_eq!(update.name, "USD Coin");
        assert_eq!(update.apy, 4.53);
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let adapter = SubgraphAdapter::new(SubgraphCfg::default()).unwrap();
        let err = adapter.try_fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::CredentialMissing(_)));
        assert!(adapter.fetch().await.is_empty());
        assert!(adapter.fetch_updates().await.is_empty());
    }
}
