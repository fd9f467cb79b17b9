use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::shared::errors::SourceError;
use crate::shared::types::{Pool, YieldUpdate};

/// Trait for upstream yield sources.
/// `fetch` never fails: every `SourceError` is logged and becomes an empty result.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short source name used in logs
    fn name(&self) -> &str;

    /// Fetch and normalize pools, surfacing the failure reason
    async fn try_fetch(&self) -> Result<Vec<Pool>, SourceError>;

    async fn fetch(&self) -> Vec<Pool> {
        match self.try_fetch().await {
            Ok(pools) => {
                info!(source = self.name(), count = pools.len(), "✅ Source fetched");
                pools
            }
            Err(SourceError::CredentialMissing(key)) => {
                debug!(
                    source = self.name(),
                    credential = %key,
                    "Source skipped, credential missing"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(source = self.name(), error = %e, "⚠️ Source unavailable, using no data");
                Vec::new()
            }
        }
    }
}

/// Records for the push feed
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_updates(&self) -> Vec<YieldUpdate>;
}
