//! Constructors for `ParamSpec`/`StrategyDefinition` literals, mirroring the
//! teacher's `strategy()`/`call_leg()` builder helpers in
//! `strategies/helpers.rs`.

use std::collections::HashMap;

use crate::models::{BoundKind, ParamSpec, StrategyDefinition};

pub fn hard(field: &str, min: Option<f64>, max: Option<f64>, weight: f64) -> ParamSpec {
    ParamSpec { field: field.into(), min, max, weight: Some(weight), kind: BoundKind::Hard }
}

pub fn soft(field: &str, min: Option<f64>, max: Option<f64>, weight: f64) -> ParamSpec {
    ParamSpec { field: field.into(), min, max, weight: Some(weight), kind: BoundKind::Soft }
}

pub fn definition(
    id: &str,
    name: &str,
    category: &str,
    risk_level: &str,
    schema: Vec<ParamSpec>,
    min_score_default: f64,
) -> StrategyDefinition {
    StrategyDefinition {
        id: id.into(),
        name: name.into(),
        category: category.into(),
        risk_level: risk_level.into(),
        schema,
        default_parameters: HashMap::new(),
        min_score_default,
    }
}
