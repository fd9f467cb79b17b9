//! Query domain - filtering, sorting and pagination over a snapshot

mod query_engine;

pub use query_engine::QueryEngine;

use serde::Serialize;

use crate::shared::types::Pool;

/// Caller-supplied query options. `None` means "not provided"; an explicit
/// `Some(0.0)` floor disables the default instead of falling back to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub symbol: Option<String>,
    pub protocol: Option<String>,
    pub chain: Option<String>,
    pub min_tvl: Option<f64>,
    pub min_apy: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl QueryOptions {
    /// True when any of symbol/protocol/chain was supplied with content
    pub fn has_explicit_filter(&self) -> bool {
        [&self.symbol, &self.protocol, &self.chain]
            .iter()
            .any(|f| normalized(f).is_some())
    }
}

/// Trimmed, lowercased filter value; blank counts as absent
pub(crate) fn normalized(filter: &Option<String>) -> Option<String> {
    filter
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub count: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// One page of results plus its pagination metadata
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub pools: Vec<Pool>,
    pub pagination: PaginationMetadata,
}
