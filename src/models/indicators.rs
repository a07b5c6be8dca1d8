//! Output types produced by [`crate::indicators`]. Purely data — the math
//! lives in the `indicators` module so these stay trivially `Clone`/`Serialize`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MovingAverages {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Macd {
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: Option<f64>,
    pub middle: Option<f64>,
    pub lower: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Kdj {
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
}

/// Summary of the chip (cost-basis) distribution at the latest bar.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChipDistribution {
    pub main_peak_price: Option<f64>,
    pub average_cost: Option<f64>,
    pub concentration: Option<f64>,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub profit_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub moving_averages: MovingAverages,
    pub macd: Macd,
    pub rsi14: Option<f64>,
    pub bollinger: Bollinger,
    pub kdj: Kdj,
    pub chips: ChipDistribution,
}

impl IndicatorSet {
    /// True when the last `lookback` bars show a MACD bullish crossover
    /// (DIF crosses above DEA) — used by the evaluator's technical-alignment
    /// bonus. `history_macd` is the full MACD series, oldest first.
    pub fn has_recent_bullish_crossover(history_macd: &[Macd], lookback: usize) -> bool {
        if history_macd.len() < 2 {
            return false;
        }
        let start = history_macd.len().saturating_sub(lookback);
        history_macd[start..]
            .windows(2)
            .any(|w| match (w[0].dif, w[0].dea, w[1].dif, w[1].dea) {
                (Some(d0), Some(e0), Some(d1), Some(e1)) => d0 <= e0 && d1 > e1,
                _ => false,
            })
    }
}
