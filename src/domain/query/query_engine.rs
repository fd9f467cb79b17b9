//! Snapshot query engine

use std::collections::HashMap;

use super::{normalized, PaginationMetadata, QueryOptions, QueryPage};
use crate::shared::config::QueryCfg;
use crate::shared::types::{Pool, Snapshot};

/// Applies default-asset, threshold and substring filters, sorts by APY and
/// slices pages. Pure computation over an immutable snapshot.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    cfg: QueryCfg,
}

impl QueryEngine {
    pub fn new(cfg: QueryCfg) -> Self {
        Self { cfg }
    }

    pub fn query(&self, snapshot: &Snapshot, options: &QueryOptions) -> QueryPage {
        let explicit = options.has_explicit_filter();
        let symbol = normalized(&options.symbol);
        let protocol = normalized(&options.protocol);
        let chain = normalized(&options.chain);
        let min_tvl = options.min_tvl.unwrap_or(self.cfg.default_min_tvl);

        let mut filtered: Vec<&Pool> = snapshot
            .pools()
            .iter()
            .filter(|pool| explicit || self.is_default_asset(pool))
            .filter(|pool| !(pool.tvl < min_tvl))
            .filter(|pool| options.min_apy.map_or(true, |floor| !(pool.apy < floor)))
            .filter(|pool| contains(&pool.symbol, symbol.as_deref()))
            .filter(|pool| contains(&pool.protocol, protocol.as_deref()))
            .filter(|pool| contains(&pool.chain, chain.as_deref()))
            .collect();

        sort_by_apy_desc(&mut filtered);

        let limit = options
            .limit
            .unwrap_or(self.cfg.default_limit as i64)
            .clamp(1, self.cfg.max_limit.max(1) as i64) as usize;
        let page = options.page.unwrap_or(1).max(1) as usize;

        paginate(&filtered, page, limit)
    }

    /// Fixed protocol allow-list with at most `curated_per_protocol` entries each.
    /// The placeholder symbol always survives the protocol filter.
    pub fn curated(&self, snapshot: &Snapshot, placeholder_symbol: &str) -> QueryPage {
        let mut candidates: Vec<&Pool> = snapshot
            .pools()
            .iter()
            .filter(|pool| self.is_default_asset(pool))
            .filter(|pool| pool.tvl > self.cfg.default_min_tvl)
            .filter(|pool| {
                pool.has_symbol(placeholder_symbol)
                    || self
                        .cfg
                        .curated_protocols
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(&pool.protocol))
            })
            .collect();

        sort_by_apy_desc(&mut candidates);

        let mut per_protocol: HashMap<String, usize> = HashMap::new();
        let selected: Vec<&Pool> = candidates
            .into_iter()
            .filter(|pool| {
                let seen = per_protocol
                    .entry(pool.protocol.to_lowercase())
                    .or_insert(0);
                *seen += 1;
                *seen <= self.cfg.curated_per_protocol
            })
            .take(self.cfg.curated_max)
            .collect();

        let limit = self.cfg.curated_max.max(1);
        paginate(&selected, 1, limit)
    }

    fn is_default_asset(&self, pool: &Pool) -> bool {
        self.cfg
            .default_assets
            .iter()
            .any(|asset| pool.has_symbol(asset))
    }
}

fn contains(field: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |n| field.to_lowercase().contains(n))
}

/// Stable sort, APY descending. NaN sorts last.
fn sort_by_apy_desc(pools: &mut [&Pool]) {
    let key = |pool: &Pool| {
        if pool.apy.is_nan() {
            f64::NEG_INFINITY
        } else {
            pool.apy
        }
    };
    pools.sort_by(|a, b| key(b).total_cmp(&key(a)));
}

fn paginate(filtered: &[&Pool], page: usize, limit: usize) -> QueryPage {
    let total_items = filtered.len();
    let start = (page - 1).saturating_mul(limit);
    let pools: Vec<Pool> = filtered
        .iter()
        .skip(start)
        .take(limit)
        .map(|pool| (*pool).clone())
        .collect();

    QueryPage {
        pagination: PaginationMetadata {
            count: pools.len(),
            page,
            limit,
            total_pages: total_items.div_ceil(limit),
            total_items,
        },
        pools,
    }
}
