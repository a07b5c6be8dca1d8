//! Per-ticker fundamentals. Fields are `Option<f64>` because missing data is
//! "absent", never zero — strategies must distinguish the two (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub roe: Option<f64>,
    pub revenue_growth_yoy: Option<f64>,
    pub profit_growth_yoy: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub gross_margin: Option<f64>,
    pub rd_ratio: Option<f64>,
    pub market_cap: Option<f64>,
}

impl Fundamentals {
    /// Accessor table keyed by the field names used in `ParamSpec.field`.
    /// Mirrors the teacher's column-name accessor pattern (`column_to_f64`)
    /// rather than reflecting over struct fields at runtime.
    pub fn get(&self, field: &str) -> Option<f64> {
        match field {
            "pe" => self.pe,
            "pb" => self.pb,
            "roe" => self.roe,
            "revenue_growth_yoy" => self.revenue_growth_yoy,
            "profit_growth_yoy" => self.profit_growth_yoy,
            "debt_ratio" => self.debt_ratio,
            "current_ratio" => self.current_ratio,
            "dividend_yield" => self.dividend_yield,
            "payout_ratio" => self.payout_ratio,
            "gross_margin" => self.gross_margin,
            "rd_ratio" => self.rd_ratio,
            "market_cap" => self.market_cap,
            _ => None,
        }
    }
}
