use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::SchedulerState;
use crate::domain::advisory::{AdviceKind, ChatMessage};
use crate::domain::query::{PaginationMetadata, QueryOptions};
use crate::shared::errors::QueryError;
use crate::shared::types::{Pool, RiskLabel};
use crate::shared::utils::parse_decimal;

/// Raw `/yields` query string. Numbers stay strings until validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldsParams {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub min_tvl: Option<String>,
    #[serde(default)]
    pub min_apy: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

impl YieldsParams {
    pub fn into_options(self) -> Result<QueryOptions, QueryError> {
        Ok(QueryOptions {
            min_tvl: parse_float("minTvl", self.min_tvl.as_deref())?,
            min_apy: parse_float("minApy", self.min_apy.as_deref())?,
            page: parse_int("page", self.page.as_deref())?,
            limit: parse_int("limit", self.limit.as_deref())?,
            symbol: self.symbol,
            protocol: self.protocol,
            chain: self.chain,
        })
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn invalid(name: &str, reason: &str) -> QueryError {
    QueryError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_float(name: &str, raw: Option<&str>) -> Result<Option<f64>, QueryError> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid(name, "expected a finite number")),
    }
}

fn parse_int(name: &str, raw: Option<&str>) -> Result<Option<i64>, QueryError> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| invalid(name, "expected an integer"))
}

#[derive(Debug, Clone, Serialize)]
pub struct YieldsResponse {
    pub timestamp: String,
    pub data: Vec<Pool>,
    pub pagination: PaginationMetadata,
}

/// `POST /agent` body. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentRequest {
    pub market_data: Option<Vec<MarketDatum>>,
    pub messages: Option<Vec<ChatMessage>>,
    pub agent_balance: Option<Value>,
}

impl AgentRequest {
    /// Positive numeric balance, accepting numbers or numeric strings
    pub fn budget(&self) -> Option<f64> {
        let value = match self.agent_balance.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => parse_decimal(s),
            _ => return None,
        };
        (value > 0.0).then_some(value)
    }

    pub fn market_pools(&self) -> Option<Vec<Pool>> {
        self.market_data
            .as_ref()
            .map(|data| data.iter().filter_map(MarketDatum::to_pool).collect())
    }
}

/// Client-supplied market row, as loose as the dashboard sends it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketDatum {
    pub symbol: Option<String>,
    pub protocol: Option<String>,
    pub name: Option<String>,
    pub chain: Option<String>,
    pub apy: Option<Value>,
    pub tvl: Option<Value>,
    pub risk: Option<String>,
    pub pool_id: Option<String>,
}

fn loose_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(parse_decimal(s)),
        _ => None,
    }
}

impl MarketDatum {
    /// Rows without a symbol or a numeric apy are dropped
    pub fn to_pool(&self) -> Option<Pool> {
        let symbol = self.symbol.clone().filter(|s| !s.trim().is_empty())?;
        let apy = loose_number(self.apy.as_ref())?;
        let protocol = self
            .protocol
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        Some(Pool {
            pool_id: self
                .pool_id
                .clone()
                .unwrap_or_else(|| format!("{}-{}", protocol, symbol).to_lowercase()),
            protocol,
            apy,
            apy_base: apy,
            apy_reward: 0.0,
            tvl: loose_number(self.tvl.as_ref()).unwrap_or(0.0),
            chain: self.chain.clone().unwrap_or_else(|| "Ethereum".to_string()),
            risk: self
                .risk
                .as_deref()
                .and_then(RiskLabel::parse)
                .unwrap_or(RiskLabel::Medium),
            symbol,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReply {
    pub analysis: String,
    #[serde(rename = "type")]
    pub kind: AdviceKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub role: &'static str,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: AdviceKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub scheduler: SchedulerState,
    pub subscribers: usize,
    pub last_sequence: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
