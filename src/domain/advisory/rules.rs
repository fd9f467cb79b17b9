//! Spread-threshold rule engine

use super::spread;
use crate::shared::types::Pool;

const ALERT_SPREAD: f64 = 1.0;
const INSIGHT_SPREAD: f64 = 0.2;

/// Classification of the current APY spread
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSignal {
    /// Spread above 1.0 point: move everything from worst to best
    StrategyAlert { from: String, to: String, spread: f64 },
    /// Spread above 0.2 point: rebalance part of the position
    Insight { to: String, spread: f64 },
    Hold,
    NoData,
}

pub struct RuleEngine {
    agent_name: String,
}

impl RuleEngine {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
        }
    }

    pub fn classify(pools: &[Pool]) -> RuleSignal {
        let Some((best, worst)) = spread(pools) else {
            return RuleSignal::NoData;
        };

        let diff = best.apy - worst.apy;
        if diff > ALERT_SPREAD {
            RuleSignal::StrategyAlert {
                from: worst.symbol.clone(),
                to: best.symbol.clone(),
                spread: diff,
            }
        } else if diff > INSIGHT_SPREAD {
            RuleSignal::Insight {
                to: best.symbol.clone(),
                spread: diff,
            }
        } else {
            RuleSignal::Hold
        }
    }

    pub fn render(&self, signal: &RuleSignal) -> String {
        let agent = &self.agent_name;
        match signal {
            RuleSignal::StrategyAlert { from, to, spread } => format!(
                "🚀 **{agent} Strategy Alert:** Huge opportunity! Swap {from} to {to} immediately. The spread is {spread:.2}%."
            ),
            RuleSignal::Insight { to, spread } => format!(
                "ℹ️ **{agent} Insight:** {to} is slightly better (+{spread:.2}%). Consider rebalancing part of the portfolio toward it."
            ),
            RuleSignal::Hold => format!(
                "🛡️ **{agent} Status:** Market is stable. Yields are competitive. Recommendation: HOLD and accumulate rewards."
            ),
            RuleSignal::NoData => format!(
                "🛡️ **{agent} Status:** No live market data is available right now. Recommendation: HOLD until feeds recover."
            ),
        }
    }

    pub fn evaluate(&self, pools: &[Pool]) -> String {
        self.render(&Self::classify(pools))
    }
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
    fn test_large_spread_is_strategy_alert() {
        let pools = vec![pool("USDC", 4.0), pool("USDT", 5.6)];
        let signal = RuleEngine::classify(&pools);
        assert!(matches!(
            &signal,
            RuleSignal::StrategyAlert { from, to, .. } if from == "USDC" && to == "USDT"
        ));

        let text = RuleEngine::new("X402").render(&signal);
        assert!(text.contains("Strategy Alert"));
        assert!(text.contains("Swap USDC to USDT"));
        assert!(text.contains("1.60%"));
    }

    #[test]
    fn test_medium_spread_is_insight() {
        let pools = vec![pool("USDC", 4.0), pool("USDT", 4.5)];
        let text = RuleEngine::new("X402").evaluate(&pools);
        assert!(text.contains("Insight"));
        assert!(text.contains("USDT"));
    }

    #[test]
    fn test_small_spread_is_hold() {
        let pools = vec![pool("USDC", 4.0), pool("USDT", 4.1)];
        assert_eq!(RuleEngine::classify(&pools), RuleSignal::Hold);
        assert!(RuleEngine::new("X402").evaluate(&pools).contains("HOLD"));
    }

    #[test]
    fn test_threshold_boundaries_are_exclusive() {
        let pools = vec![pool("USDC", 4.0), pool("USDT", 5.0)];
        assert!(matches!(RuleEngine::classify(&pools), RuleSignal::Insight { .. }));

        let pools = vec![pool("USDC", 0.0), pool("USDT", 0.0)];
        assert_eq!(RuleEngine::classify(&pools), RuleSignal::Hold);
    }

    #[test]
    fn test_empty_snapshot_holds() {
        assert_eq!(RuleEngine::classify(&[]), RuleSignal::NoData);
        assert!(RuleEngine::new("X402").evaluate(&[]).contains("HOLD"));
    }
}
