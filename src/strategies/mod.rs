pub mod growth;
pub mod helpers;
pub mod momentum;
pub mod value;

use crate::models::StrategyDefinition;

pub fn all_strategies() -> Vec<StrategyDefinition> {
    let mut strategies = Vec::new();
    strategies.extend(value::all());
    strategies.extend(growth::all());
    strategies.extend(momentum::all());
    strategies
}

pub fn find_strategy(id: &str) -> Option<StrategyDefinition> {
    all_strategies().into_iter().find(|s| s.id == id)
}
