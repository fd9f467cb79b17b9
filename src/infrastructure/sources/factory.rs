use std::sync::Arc;
use tracing::info;

use super::defillama::DefiLlamaAdapter;
use super::subgraph::SubgraphAdapter;
use super::traits::SourceAdapter;
use crate::shared::config::SourcesCfg;
use crate::shared::errors::SourceError;

/// Supported upstream sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    DefiLlama,
    Subgraph,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DefiLlama => "DefiLlama yields",
            SourceKind::Subgraph => "Lending subgraph",
        }
    }

    /// Kinds switched on in the config, in registration order
    pub fn enabled(cfg: &SourcesCfg) -> Vec<SourceKind> {
        let mut kinds = Vec::new();
        if cfg.defillama.enabled {
            kinds.push(SourceKind::DefiLlama);
        }
        if cfg.subgraph.enabled {
            kinds.push(SourceKind::Subgraph);
        }
        kinds
    }
}

pub fn create_adapter(
    kind: SourceKind,
    cfg: &SourcesCfg,
) -> Result<Arc<dyn SourceAdapter>, SourceError> {
    match kind {
        SourceKind::DefiLlama => Ok(Arc::new(DefiLlamaAdapter::new(cfg.defillama.clone())?)),
        SourceKind::Subgraph => Ok(Arc::new(SubgraphAdapter::new(cfg.subgraph.clone())?)),
    }
}

/// Create every enabled adapter. Registration order is the merge order.
pub fn create_adapters(cfg: &SourcesCfg) -> Result<Vec<Arc<dyn SourceAdapter>>, SourceError> {
    let mut adapters = Vec::new();
    for kind in SourceKind::enabled(cfg) {
        info!("🔧 Creating {} adapter...", kind.as_str());
        adapters.push(create_adapter(kind, cfg)?);
    }
    info!("🎯 Created {} adapters", adapters.len());
    Ok(adapters)
}
