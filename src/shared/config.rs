//! Service configuration: `Config.toml` plus credentials from the environment

use serde::Deserialize;
use std::{fs, path::Path};

use crate::shared::errors::AppError;

pub const GRAPH_API_KEY_ENV: &str = "GRAPH_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
    pub bind: String,
    pub socket_path: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            socket_path: "/api/socket".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefiLlamaCfg {
    pub enabled: bool,
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for DefiLlamaCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://yields.llama.fi/pools".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Unit of the subgraph `rates.rate` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
    /// Already a percentage (Messari schema BigDecimal)
    Percent,
    /// Fixed-point fraction scaled by 1e27
    Ray,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubgraphCfg {
    pub enabled: bool,
    pub gateway_url: String,
    pub subgraph_id: String,
    /// Input token addresses to query
    pub assets: Vec<String>,
    pub protocol: String,
    pub chain: String,
    pub rate_unit: RateUnit,
    pub timeout_ms: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SubgraphCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            gateway_url: "https://gateway.thegraph.com/api".to_string(),
            subgraph_id: "JCNWRypm7FYwV8fx5HhzZPSFaMxgkPuw4TnR3Gpi81zk".to_string(),
            assets: vec![
                "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(), // USDC
                "0xdac17f958d2ee523a2206206994597c13d831ec7".to_string(), // USDT
            ],
            protocol: "aave-v3".to_string(),
            chain: "Ethereum".to_string(),
            rate_unit: RateUnit::Percent,
            timeout_ms: 10_000,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesCfg {
    pub defillama: DefiLlamaCfg,
    pub subgraph: SubgraphCfg,
}

/// How records sharing protocol/symbol/chain across sources are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    #[default]
    KeepAll,
    FirstWins,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorCfg {
    pub dedup: DedupPolicy,
    pub inject_placeholder: bool,
    pub placeholder_symbol: String,
    /// Outer bound per adapter, on top of the adapter's own HTTP timeout
    pub source_timeout_ms: u64,
}

impl Default for AggregatorCfg {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::KeepAll,
            inject_placeholder: true,
            placeholder_symbol: "CevUSD".to_string(),
            source_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryCfg {
    pub default_assets: Vec<String>,
    pub default_min_tvl: f64,
    pub default_limit: usize,
    pub max_limit: usize,
    pub curated_protocols: Vec<String>,
    pub curated_per_protocol: usize,
    pub curated_max: usize,
}

impl Default for QueryCfg {
    fn default() -> Self {
        Self {
            default_assets: ["USDC", "USDT", "USDE", "CEVUSD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_min_tvl: 10_000.0,
            default_limit: 50,
            max_limit: 100,
            curated_protocols: [
                "uniswap-v3",
                "aerodrome",
                "aerodrome-v1",
                "aerodrome-slipstream",
                "aave-v3",
                "morpho",
                "morpho-v1",
                "pendle",
                "curve-dex",
                "silo-finance",
                "silo-v2",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            curated_per_protocol: 5,
            curated_max: 50,
        }
    }
}

/// Where the push feed gets its records from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedSourceKind {
    /// Narrow records straight from the lending subgraph
    Subgraph,
    /// The merged aggregator snapshot
    Aggregate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastCfg {
    pub enabled: bool,
    pub interval_secs: u64,
    pub source: FeedSourceKind,
    pub replay_on_connect: bool,
    pub channel_capacity: usize,
}

impl Default for BroadcastCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            source: FeedSourceKind::Subgraph,
            replay_on_connect: true,
            channel_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisoryCfg {
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
    pub agent_name: String,
    /// Amount proposed in action blocks when the caller sends no balance
    pub default_budget: f64,
    pub budget_asset: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AdvisoryCfg {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_ms: 15_000,
            agent_name: "X402".to_string(),
            default_budget: 100.0,
            budget_asset: "USDC".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerCfg,
    pub sources: SourcesCfg,
    pub aggregator: AggregatorCfg,
    pub query: QueryCfg,
    pub broadcast: BroadcastCfg,
    pub advisory: AdvisoryCfg,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        toml::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Pull credentials from the process environment. Blank values count as absent.
    pub fn with_env_credentials(mut self) -> Self {
        self.sources.subgraph.api_key = read_credential(GRAPH_API_KEY_ENV);
        self.advisory.api_key = read_credential(OPENAI_API_KEY_ENV);
        self
    }
}

fn read_credential(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file_sections() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");
        assert_eq!(cfg.broadcast.interval_secs, 10);
        assert_eq!(cfg.query.default_min_tvl, 10_000.0);
        assert_eq!(cfg.aggregator.dedup, DedupPolicy::KeepAll);
        assert_eq!(cfg.sources.subgraph.rate_unit, RateUnit::Percent);
        assert!(cfg.sources.subgraph.api_key.is_none());
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1:8080"

[aggregator]
dedup = "first-wins"

[sources.subgraph]
rate_unit = "ray"

[broadcast]
source = "aggregate"
replay_on_connect = false
"#
        )
        .unwrap();

        let cfg = Config::from_file(file.path()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.server.socket_path, "/api/socket");
        assert_eq!(cfg.aggregator.dedup, DedupPolicy::FirstWins);
        assert_eq!(cfg.sources.subgraph.rate_unit, RateUnit::Ray);
        assert_eq!(cfg.broadcast.source, FeedSourceKind::Aggregate);
        assert!(!cfg.broadcast.replay_on_connect);
        assert_eq!(cfg.sources.subgraph.assets.len(), 2);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let err = Config::from_toml("[server\nbind = 1").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here/Config.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
