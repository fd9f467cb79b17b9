//! Advisory domain - recommendation outcomes and the deterministic fallbacks

mod rules;
mod keywords;

pub use keywords::{KeywordIntent, KeywordResponder, ACTION_CLOSE, ACTION_OPEN};
pub use rules::{RuleEngine, RuleSignal};

use serde::{Deserialize, Serialize};

use crate::shared::types::Pool;

/// Which path produced an advice text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdviceKind {
    #[serde(rename = "AI_GENERATED")]
    Generated,
    #[serde(rename = "RULE_BASED")]
    RuleBased,
}

/// Outcome of one advisory request
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub text: String,
    pub kind: AdviceKind,
}

impl Advice {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AdviceKind::Generated,
        }
    }

    pub fn rule_based(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AdviceKind::RuleBased,
        }
    }
}

/// Chat turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.eq_ignore_ascii_case("user")
    }
}

/// Highest and lowest APY pools, first seen wins ties
pub fn spread(pools: &[Pool]) -> Option<(&Pool, &Pool)> {
    let mut iter = pools.iter();
    let first = iter.next()?;
    let (mut best, mut worst) = (first, first);
    for pool in iter {
        if pool.apy > best.apy {
            best = pool;
        }
        if pool.apy < worst.apy {
            worst = pool;
        }
    }
    Some((best, worst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::RiskLabel;

    fn pool(symbol: &str, apy: f64) -> Pool {
        Pool {
            protocol: "aave-v3".to_string(),
            symbol: symbol.to_string(),
            apy,
            apy_base: apy,
            apy_reward: 0.0,
            tvl: 1e6,
            chain: "Ethereum".to_string(),
            risk: RiskLabel::LowLending,
            pool_id: symbol.to_lowercase(),
        }
    }

    #[test]
    fn test_spread_first_seen_wins_ties() {
        let pools = vec![pool("A", 5.0), pool("B", 5.0), pool("C", 1.0), pool("D", 1.0)];
        let (best, worst) = spread(&pools).unwrap();
        assert_eq!(best.symbol, "A");
        assert_eq!(worst.symbol, "C");
    }

    #[test]
    fn test_spread_empty() {
        assert!(spread(&[]).is_none());
    }

    #[test]
    fn test_advice_kind_tags() {
        assert_eq!(serde_json::to_value(AdviceKind::Generated).unwrap(), "AI_GENERATED");
        assert_eq!(serde_json::to_value(AdviceKind::RuleBased).unwrap(), "RULE_BASED");
    }
}
