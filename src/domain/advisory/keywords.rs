//! Keyword fallback for the conversational agent

use super::{spread, ChatMessage};
use crate::shared::types::Pool;
use crate::shared::utils::format_usd;

pub const ACTION_OPEN: &str = "[ACTION_TRIGGER]";
pub const ACTION_CLOSE: &str = "[/ACTION_TRIGGER]";

const DEFAULT_PROTOCOL: &str = "aave-v3";
const DEFAULT_CHAIN: &str = "Ethereum";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordIntent {
    Compare,
    Invest,
    Capabilities,
}

impl KeywordIntent {
    pub fn detect(utterance: &str) -> Self {
        let text = utterance.to_lowercase();
        if text.contains("compare") || text.contains("best") {
            KeywordIntent::Compare
        } else if text.contains("invest") || text.contains("do it") {
            KeywordIntent::Invest
        } else {
            KeywordIntent::Capabilities
        }
    }
}

/// Answers the latest user message from the snapshot alone
pub struct KeywordResponder {
    agent_name: String,
    budget_asset: String,
}

impl KeywordResponder {
    pub fn new(agent_name: impl Into<String>, budget_asset: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            budget_asset: budget_asset.into(),
        }
    }

    pub fn respond(&self, conversation: &[ChatMessage], pools: &[Pool], budget: f64) -> String {
        let latest = conversation
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        match KeywordIntent::detect(latest) {
            KeywordIntent::Compare => self.compare(pools),
            KeywordIntent::Invest => self.action_block(pools, budget),
            KeywordIntent::Capabilities => self.capabilities(),
        }
    }

    fn compare(&self, pools: &[Pool]) -> String {
        let Some((best, worst)) = spread(pools) else {
            return "I don't have live market data right now, so I can't compare pools yet. Try again after the next refresh.".to_string();
        };

        format!(
            "Comparing {count} live pools: the best is {best_symbol} on {best_protocol} ({best_chain}) at {best_apy:.2}% APY with {best_tvl} TVL. \
             The lowest is {worst_symbol} on {worst_protocol} at {worst_apy:.2}%. Spread: {diff:.2}%.",
            count = pools.len(),
            best_symbol = best.symbol,
            best_protocol = best.protocol,
            best_chain = best.chain,
            best_apy = best.apy,
            best_tvl = format_usd(best.tvl),
            worst_symbol = worst.symbol,
            worst_protocol = worst.protocol,
            worst_apy = worst.apy,
            diff = best.apy - worst.apy,
        )
    }

    /// Descriptive only; execution belongs to the caller
    fn action_block(&self, pools: &[Pool], budget: f64) -> String {
        let (protocol, operation, destination) = match spread(pools) {
            Some((best, _)) => (
                best.protocol.clone(),
                format!("Supply {}", best.symbol),
                format!("{} pool {}", best.chain, best.pool_id),
            ),
            None => (
                DEFAULT_PROTOCOL.to_string(),
                format!("Supply {}", self.budget_asset),
                format!("{} lending market", DEFAULT_CHAIN),
            ),
        };

        format!(
            "Understood. Here is the proposed transaction for your review.\n\
             {ACTION_OPEN}\n\
             Protocol: {protocol}\n\
             Operation: {operation}\n\
             Amount: {budget:.2} {asset}\n\
             Destination: {destination}\n\
             {ACTION_CLOSE}",
            asset = self.budget_asset,
        )
    }

    fn capabilities(&self) -> String {
        format!(
            "I am the {} Agent. I can compare live yields across protocols, assess pool risk, and prepare a supply transaction for you to confirm. Ask me to \"compare\" pools or to \"invest\".",
            self.agent_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::RiskLabel;

    fn pool(protocol: &str, symbol: &str, apy: f64) -> Pool {
        Pool {
            protocol: protocol.to_string(),
            symbol: symbol.to_string(),
            apy,
            apy_base: apy,
            apy_reward: 0.0,
            tvl: 2_500_000.0,
            chain: "Base".to_string(),
            risk: RiskLabel::LowLendingStaking,
            pool_id: format!("{}-{}", protocol, symbol),
        }
    }

    fn responder() -> KeywordResponder {
        KeywordResponder::new("X402", "USDC")
    }

    #[test]
    fn test_detect_intent() {
        assert_eq!(KeywordIntent::detect("Compare USDC and USDT"), KeywordIntent::Compare);
        assert_eq!(KeywordIntent::detect("what's the BEST yield?"), KeywordIntent::Compare);
        assert_eq!(KeywordIntent::detect("invest 50 please"), KeywordIntent::Invest);
        assert_eq!(KeywordIntent::detect("ok, do it"), KeywordIntent::Invest);
        assert_eq!(KeywordIntent::detect("hello"), KeywordIntent::Capabilities);
    }

    #[test]
    fn test_compare_mentions_best_pool() {
        let pools = vec![pool("aave-v3", "USDC", 4.0), pool("morpho", "USDT", 6.5)];
        let text = responder().respond(&[ChatMessage::user("compare")], &pools, 100.0);
        assert!(text.contains("USDT on morpho"));
        assert!(text.contains("6.50%"));
        assert!(text.contains("$2.50M"));
    }

    #[test]
    fn test_invest_renders_action_block() {
        let pools = vec![pool("aave-v3", "USDC", 4.0), pool("morpho", "USDT", 6.5)];
        let conversation = vec![
            ChatMessage::assistant("Hello! How can I help?"),
            ChatMessage::user("Sounds good, do it"),
        ];
        let text = responder().respond(&conversation, &pools, 250.0);

        let start = text.find(ACTION_OPEN).unwrap();
        let end = text.find(ACTION_CLOSE).unwrap();
        assert!(start < end);
        let block = &text[start..end];
        assert!(block.contains("Protocol: morpho"));
        assert!(block.contains("Operation: Supply USDT"));
        assert!(block.contains("Amount: 250.00 USDC"));
        assert!(block.contains("Destination: Base pool morpho-USDT"));
    }

    #[test]
    fn test_invest_without_data_uses_defaults() {
        let text = responder().respond(&[ChatMessage::user("invest")], &[], 10.0);
        assert!(text.contains("Protocol: aave-v3"));
        assert!(text.contains("Operation: Supply USDC"));
    }

    #[test]
    fn test_uses_latest_user_message() {
        let conversation = vec![
            ChatMessage::user("invest"),
            ChatMessage::assistant("..."),
            ChatMessage::user("thanks"),
        ];
        let text = responder().respond(&conversation, &[], 10.0);
        assert!(text.contains("I am the X402 Agent"));
        assert!(!text.contains(ACTION_OPEN));
    }
}
