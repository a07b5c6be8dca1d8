//! Pure, hand-rolled technical indicator math — the `IndicatorKernel`
//! (spec §4.5). Every function takes plain slices so it can be unit tested
//! without touching the provider/cache/gateway stack.

pub mod bollinger;
pub mod chips;
pub mod kdj;
pub mod macd;
pub mod moving_average;
pub mod rsi;

use crate::models::History;
use crate::models::indicators::{IndicatorSet, MovingAverages};

/// Computes the full `IndicatorSet` for one ticker's history. Every field is
/// `None`/absent-shaped until enough bars exist for that indicator's window
/// (spec §4.5's per-indicator minimums).
pub fn compute_indicator_set(history: &History) -> IndicatorSet {
    let closes = history.closes();

    let moving_averages = MovingAverages {
        ma5: moving_average::sma_latest(&closes, 5),
        ma10: moving_average::sma_latest(&closes, 10),
        ma20: moving_average::sma_latest(&closes, 20),
        ma60: moving_average::sma_latest(&closes, 60),
    };

    IndicatorSet {
        moving_averages,
        macd: macd::macd_latest(&closes),
        rsi14: rsi::rsi_latest(&closes, 14),
        bollinger: bollinger::bollinger_latest(&closes),
        kdj: kdj::kdj_latest(&history.bars),
        chips: chips::chip_distribution(&history.bars),
    }
}
