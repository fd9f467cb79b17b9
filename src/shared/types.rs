//! Common types used across the application

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Risk label attached to every pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "High (Impermanent Loss)")]
    HighImpermanentLoss,
    #[serde(rename = "Low (Lending/Staking)")]
    LowLendingStaking,
    #[serde(rename = "Low (Lending)")]
    LowLending,
    #[serde(rename = "Medium")]
    Medium,
}

impl RiskLabel {
    /// Map the upstream impermanent-loss flag ("yes" / "no") to a label
    pub fn from_il_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(f) if f.eq_ignore_ascii_case("yes") => RiskLabel::HighImpermanentLoss,
            _ => RiskLabel::LowLendingStaking,
        }
    }

    /// Parse a label as rendered by `as_str`
    pub fn parse(label: &str) -> Option<Self> {
        [
            RiskLabel::HighImpermanentLoss,
            RiskLabel::LowLendingStaking,
            RiskLabel::LowLending,
            RiskLabel::Medium,
        ]
        .into_iter()
        .find(|risk| risk.as_str().eq_ignore_ascii_case(label.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::HighImpermanentLoss => "High (Impermanent Loss)",
            RiskLabel::LowLendingStaking => "Low (Lending/Staking)",
            RiskLabel::LowLending => "Low (Lending)",
            RiskLabel::Medium => "Medium",
        }
    }
}

/// Normalized yield opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub protocol: String,
    pub symbol: String,
    pub apy: f64,
    #[serde(default)]
    pub apy_base: f64,
    #[serde(default)]
    pub apy_reward: f64,
    pub tvl: f64,
    pub chain: String,
    pub risk: RiskLabel,
    pub pool_id: String,
}

impl Pool {
    /// Case-insensitive symbol comparison
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}

/// Immutable, timestamped set of pools produced by one aggregation run
#[derive(Debug, Clone)]
pub struct Snapshot {
    timestamp: DateTime<Utc>,
    pools: Arc<[Pool]>,
}

impl Snapshot {
    pub fn new(pools: Vec<Pool>) -> Self {
        Self::at(Utc::now(), pools)
    }

    pub fn at(timestamp: DateTime<Utc>, pools: Vec<Pool>) -> Self {
        Self {
            timestamp,
            pools: pools.into(),
        }
    }

    /// ISO-8601 with millisecond precision, e.g. `2024-05-01T10:30:00.000Z`
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Push-feed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldUpdate {
    pub symbol: String,
    pub name: String,
    pub apy: f64,
    pub tvl: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&Pool> for YieldUpdate {
    fn from(pool: &Pool) -> Self {
        Self {
            symbol: pool.symbol.clone(),
            name: pool.protocol.clone(),
            apy: pool.apy,
            tvl: pool.tvl,
            timestamp: Utc::now(),
        }
    }
}
