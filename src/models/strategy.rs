//! Strategy definitions and the parameter bindings supplied at job-start time.
//!
//! Mirrors the teacher's `StrategyDef`/leg-schema split (`engine/types.rs`,
//! `strategies/mod.rs`): a definition is immutable, process-wide metadata; a
//! binding is the caller-supplied values checked against it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of bound a parameter enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    /// Violating the bound rejects the ticker outright (spec §4.6 step 1).
    Hard,
    /// Violating the bound only costs the parameter's weight.
    Soft,
}

/// One named numeric bound in a strategy's parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Field name, resolved against a ticker's merged data via the accessor
    /// tables in `Fundamentals::get` / `QuoteSnapshot` / `IndicatorSet`.
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Defaults to 1.0 when absent (spec §4.6 step 1).
    pub weight: Option<f64>,
    pub kind: BoundKind,
}

impl ParamSpec {
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    /// Whether `value` satisfies this bound's `[min, max]` range. Bounds with
    /// no `min`/`max` set are trivially satisfied.
    pub fn satisfied_by(&self, value: f64) -> bool {
        let min_ok = self.min.map_or(true, |m| value >= m);
        let max_ok = self.max.map_or(true, |m| value <= m);
        min_ok && max_ok
    }
}

/// An immutable, process-lifetime strategy definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
    pub risk_level: String,
    pub schema: Vec<ParamSpec>,
    /// Values used for any schema field the caller's binding omits.
    pub default_parameters: HashMap<String, f64>,
    pub min_score_default: f64,
}

/// A concrete binding of numeric values to a strategy's schema, supplied at
/// job-start time. Missing entries fall back to the definition's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub values: HashMap<String, f64>,
}

impl StrategyParameters {
    /// Resolve the effective bound set for `definition`: the schema's
    /// `{min, max}` shape stays fixed (it's part of the immutable
    /// definition), but per-field override values from the caller's binding
    /// are not modeled here — spec.md's schema carries min/max as part of the
    /// strategy itself, with `StrategyParameters` supplying *scalar target
    /// values* (e.g. a caller-chosen `pe_max`) that this method substitutes
    /// into the matching `ParamSpec.max`/`min` slot by field name.
    pub fn resolve(&self, definition: &StrategyDefinition) -> Vec<ParamSpec> {
        definition
            .schema
            .iter()
            .cloned()
            .map(|mut spec| {
                if let Some(v) = self
                    .values
                    .get(&format!("{}_max", spec.field))
                    .or_else(|| self.values.get(&spec.field))
                {
                    spec.max = Some(*v);
                }
                if let Some(v) = self.values.get(&format!("{}_min", spec.field)) {
                    spec.min = Some(*v);
                }
                spec
            })
            .collect()
    }
}
