//! KDJ(9, 3, 3): classical recursion from %K over a 9-bar rolling
//! high/low window, smoothed twice (spec §4.5).

use crate::models::{HistoryBar, indicators::Kdj};

/// Full K/D/J series, oldest-first. Absent until 9 bars exist.
pub fn kdj_series(bars: &[HistoryBar]) -> Vec<Kdj> {
    let n = bars.len();
    let mut out = vec![Kdj::default(); n];
    if n < 9 {
        return out;
    }

    // K and D seed at 50.0, the standard convention when no prior value
    // exists yet.
    let mut prev_k = 50.0;
    let mut prev_d = 50.0;

    for i in 8..n {
        let window = &bars[i + 1 - 9..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let rsv = if (highest - lowest).abs() < f64::EPSILON {
            50.0
        } else {
            (bars[i].close - lowest) / (highest - lowest) * 100.0
        };

        let k = (2.0 / 3.0) * prev_k + (1.0 / 3.0) * rsv;
        let d = (2.0 / 3.0) * prev_d + (1.0 / 3.0) * k;
        let j = 3.0 * k - 2.0 * d;

        out[i] = Kdj { k: Some(k), d: Some(d), j: Some(j) };
        prev_k = k;
        prev_d = d;
    }

    out
}

pub fn kdj_latest(bars: &[HistoryBar]) -> Kdj {
    kdj_series(bars).into_iter().next_back().unwrap_or_default()
}
