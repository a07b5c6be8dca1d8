use super::helpers::*;
use crate::models::StrategyDefinition;

/// Rewards sustained top- and bottom-line growth; tolerates a richer
/// valuation than the value screens.
pub fn high_growth() -> StrategyDefinition {
    definition(
        "high_growth",
        "High Growth",
        "growth",
        "medium",
        vec![
            hard("revenue_growth_yoy", Some(15.0), None, 2.0),
            hard("profit_growth_yoy", Some(10.0), None, 2.0),
            soft("gross_margin", Some(20.0), None, 1.0),
            soft("pe", None, Some(80.0), 1.0),
            soft("debt_ratio", None, Some(70.0), 1.0),
        ],
        60.0,
    )
}

/// Early-stage growth screen that weighs R&D intensity over current
/// profitability.
pub fn rd_intensive() -> StrategyDefinition {
    definition(
        "rd_intensive",
        "R&D Intensive",
        "growth",
        "high",
        vec![
            hard("rd_ratio", Some(5.0), None, 2.0),
            soft("revenue_growth_yoy", Some(10.0), None, 1.5),
            soft("current_ratio", Some(1.0), None, 1.0),
        ],
        50.0,
    )
}

pub fn all() -> Vec<StrategyDefinition> {
    vec![high_growth(), rd_intensive()]
}
