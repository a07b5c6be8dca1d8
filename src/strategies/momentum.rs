use super::helpers::*;
use crate::models::StrategyDefinition;

/// Technical breakout screen: healthy RSI band, active turnover, no
/// extreme valuation.
pub fn technical_momentum() -> StrategyDefinition {
    definition(
        "technical_momentum",
        "Technical Momentum",
        "momentum",
        "high",
        vec![
            hard("rsi14", Some(45.0), Some(80.0), 2.0),
            soft("turnover_rate", Some(2.0), None, 1.5),
            soft("pe", None, Some(100.0), 0.5),
            hard("market_cap", Some(200.0), None, 1.0),
        ],
        55.0,
    )
}

pub fn all() -> Vec<StrategyDefinition> {
    vec![technical_momentum()]
}
