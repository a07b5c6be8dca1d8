//! Bollinger(20, 2σ): middle = SMA20, bands = middle ± 2 × population
//! stddev of the last 20 closes (spec §4.5).

use crate::models::indicators::Bollinger;

use super::moving_average::{sma_latest, stddev_latest};

pub fn bollinger_latest(closes: &[f64]) -> Bollinger {
    let middle = sma_latest(closes, 20);
    let sd = stddev_latest(closes, 20);
    match (middle, sd) {
        (Some(m), Some(s)) => Bollinger {
            upper: Some(m + 2.0 * s),
            middle: Some(m),
            lower: Some(m - 2.0 * s),
        },
        _ => Bollinger::default(),
    }
}

/// Position of `price` within the Bollinger band, as a fraction where 0.0 is
/// the lower band and 1.0 is the upper band — used by the boundary's
/// `key_indicators.Bollinger_position` field (spec §6).
pub fn band_position(price: f64, band: &Bollinger) -> Option<f64> {
    match (band.upper, band.lower) {
        (Some(u), Some(l)) if (u - l).abs() > f64::EPSILON => Some((price - l) / (u - l)),
        _ => None,
    }
}
