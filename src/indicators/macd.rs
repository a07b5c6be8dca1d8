//! MACD(12, 26, 9): DIF = EMA12 − EMA26, DEA = EMA9(DIF),
//! histogram = 2 × (DIF − DEA) (spec §4.5).

use crate::models::indicators::Macd;

fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Full MACD series, oldest-first. DIF is defined once both EMAs exist
/// (from the first bar, since EMA is seeded at the first value); DEA needs
/// 9 DIF values to be a "real" EMA9, but — matching standard charting
/// behavior — we seed DEA's EMA the same way, from the first DIF value.
pub fn macd_series(closes: &[f64]) -> Vec<Macd> {
    if closes.len() < 26 {
        return vec![Macd::default(); closes.len()];
    }
    let ema12 = ema_series(closes, 12);
    let ema26 = ema_series(closes, 26);
    let dif: Vec<f64> = ema12.iter().zip(&ema26).map(|(a, b)| a - b).collect();
    let dea = ema_series(&dif, 9);

    closes
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i < 25 {
                Macd::default()
            } else {
                let d = dif[i];
                let e = dea[i];
                Macd {
                    dif: Some(d),
                    dea: Some(e),
                    histogram: Some(2.0 * (d - e)),
                }
            }
        })
        .collect()
}

pub fn macd_latest(closes: &[f64]) -> Macd {
    macd_series(closes).into_iter().next_back().unwrap_or_default()
}
