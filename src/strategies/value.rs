use super::helpers::*;
use crate::models::StrategyDefinition;

/// The canonical low-risk value screen: cheap relative to earnings and book
/// value, profitable, and large enough to be liquid.
pub fn blue_chip_stable() -> StrategyDefinition {
    definition(
        "blue_chip_stable",
        "Blue-chip Stable",
        "value",
        "low",
        vec![
            hard("pe", None, Some(25.0), 2.0),
            soft("pb", None, Some(3.0), 1.0),
            hard("roe", Some(10.0), None, 2.0),
            hard("market_cap", Some(1000.0), None, 1.0),
            soft("debt_ratio", None, Some(60.0), 1.0),
        ],
        60.0,
    )
}

/// Deeper value screen that tolerates more leverage for a steeper PE/PB
/// discount.
pub fn deep_value() -> StrategyDefinition {
    definition(
        "deep_value",
        "Deep Value",
        "value",
        "medium",
        vec![
            hard("pe", None, Some(15.0), 2.0),
            hard("pb", None, Some(1.5), 2.0),
            soft("roe", Some(5.0), None, 1.0),
            soft("dividend_yield", Some(2.0), None, 1.0),
        ],
        55.0,
    )
}

pub fn all() -> Vec<StrategyDefinition> {
    vec![blue_chip_stable(), deep_value()]
}
