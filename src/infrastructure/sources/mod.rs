//! Upstream yield sources

pub mod defillama;
pub mod factory;
pub mod subgraph;
pub mod traits;

pub use defillama::DefiLlamaAdapter;
pub use factory::{create_adapter, create_adapters, SourceKind};
pub use subgraph::SubgraphAdapter;
pub use traits::{SourceAdapter, UpdateSource};
