//! Simple moving averages. Window `N` needs at least `N` bars; otherwise the
//! value is absent (spec §4.5).

/// Full SMA(window) series, oldest-first, aligned to `closes` — `None` for
/// indices before the window fills.
pub fn sma_series(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }
    (0..closes.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let slice = &closes[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

pub fn sma_latest(closes: &[f64], window: usize) -> Option<f64> {
    sma_series(closes, window).into_iter().next_back().flatten()
}

/// Population standard deviation of the last `window` closes, or `None` if
/// fewer than `window` bars exist.
pub fn stddev_latest(closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < window || window == 0 {
        return None;
    }
    let slice = &closes[closes.len() - window..];
    let mean = slice.iter().sum::<f64>() / window as f64;
    let variance = slice.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / window as f64;
    Some(variance.sqrt())
}
