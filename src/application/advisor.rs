//! Advisory engine: generative backend first, deterministic rules after

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::advisory::{Advice, ChatMessage, KeywordResponder, RuleEngine};
use crate::infrastructure::llm::{GenerativeBackend, OpenAiClient};
use crate::shared::config::AdvisoryCfg;
use crate::shared::errors::AdvisoryError;
use crate::shared::types::Pool;

/// Pools included in the backend prompt
const PROMPT_POOL_LIMIT: usize = 20;

#[derive(Serialize)]
struct PromptPool<'a> {
    protocol: &'a str,
    symbol: &'a str,
    apy: f64,
    tvl: f64,
    chain: &'a str,
    risk: &'static str,
}

pub struct AdvisoryEngine {
    backend: Option<Arc<dyn GenerativeBackend>>,
    rules: RuleEngine,
    keywords: KeywordResponder,
    cfg: AdvisoryCfg,
}

impl AdvisoryEngine {
    pub fn new(backend: Option<Arc<dyn GenerativeBackend>>, cfg: AdvisoryCfg) -> Self {
        Self {
            backend,
            rules: RuleEngine::new(cfg.agent_name.clone()),
            keywords: KeywordResponder::new(cfg.agent_name.clone(), cfg.budget_asset.clone()),
            cfg,
        }
    }

    /// Build with the OpenAI-compatible backend when a key is configured
    pub fn from_config(cfg: AdvisoryCfg) -> Self {
        let backend: Option<Arc<dyn GenerativeBackend>> = match OpenAiClient::new(&cfg) {
            Ok(client) => {
                info!(model = %cfg.model, "🤖 Generative advisory backend enabled");
                Some(Arc::new(client))
            }
            Err(e) => {
                info!(reason = %e, "Advisory running in rule-based mode");
                None
            }
        };
        Self::new(backend, cfg)
    }

    /// Produce advice. Never fails: backend errors select the deterministic path.
    pub async fn advise(
        &self,
        pools: &[Pool],
        conversation: Option<&[ChatMessage]>,
        budget: Option<f64>,
    ) -> Advice {
        let budget = budget
            .filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or(self.cfg.default_budget);

        match self.generate(pools, conversation, budget).await {
            Ok(text) => Advice::generated(text),
            Err(AdvisoryError::CredentialMissing) => self.fallback(pools, conversation, budget),
            Err(e) => {
                warn!(error = %e, "⚠️ Generative backend failed, using rule-based advice");
                self.fallback(pools, conversation, budget)
            }
        }
    }

    async fn generate(
        &self,
        pools: &[Pool],
        conversation: Option<&[ChatMessage]>,
        budget: f64,
    ) -> Result<String, AdvisoryError> {
        let backend = self.backend.as_ref().ok_or(AdvisoryError::CredentialMissing)?;

        let mut messages = vec![ChatMessage::system(self.system_prompt(pools, budget))];
        if let Some(turns) = conversation {
            messages.extend(turns.iter().filter(|m| m.role != "system").cloned());
        }

        let limit = Duration::from_millis(self.cfg.timeout_ms);
        debug!(backend = backend.name(), turns = messages.len(), "Requesting generated advice");
        match timeout(limit, backend.complete(&messages)).await {
            Ok(reply) => reply,
            Err(_) => Err(AdvisoryError::Timeout(limit)),
        }
    }

    fn fallback(
        &self,
        pools: &[Pool],
        conversation: Option<&[ChatMessage]>,
        budget: f64,
    ) -> Advice {
        match conversation {
            Some(turns) if !turns.is_empty() => {
                Advice::rule_based(self.keywords.respond(turns, pools, budget))
            }
            _ => Advice::rule_based(self.rules.evaluate(pools)),
        }
    }

    fn system_prompt(&self, pools: &[Pool], budget: f64) -> String {
        let mut top: Vec<&Pool> = pools.iter().collect();
        top.sort_by(|a, b| b.apy.total_cmp(&a.apy));
        let market: Vec<PromptPool> = top
            .into_iter()
            .take(PROMPT_POOL_LIMIT)
            .map(|p| PromptPool {
                protocol: &p.protocol,
                symbol: &p.symbol,
                apy: p.apy,
                tvl: p.tvl,
                chain: &p.chain,
                risk: p.risk.as_str(),
            })
            .collect();
        let market = serde_json::to_string(&market).unwrap_or_else(|_| "[]".to_string());

        format!(
            "You are an expert DeFi agent named \"{agent}\".\n\
             Analyze these live yields: {market}.\n\
             The user has a budget of {budget:.2} {asset}.\n\
             Rules:\n\
             1. Identify the asset with the highest safe yield.\n\
             2. If the difference between assets is < 0.5%, recommend \"HOLD\".\n\
             3. If one is significantly higher, recommend \"SWAP\".\n\
             4. Keep it short (max 2 sentences).\n\
             5. When proposing a deposit, wrap it in {open} ... {close} with Protocol, Operation, Amount and Destination lines.",
            agent = self.cfg.agent_name,
            asset = self.cfg.budget_asset,
            open = crate::domain::advisory::ACTION_OPEN,
            close = crate::domain::advisory::ACTION_CLOSE,
        )
    }
}
