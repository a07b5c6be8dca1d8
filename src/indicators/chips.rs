//! Chip (cost-basis) distribution: volume is spread across 100 price
//! buckets spanning `[min low, max high]` of the history, weighted by
//! `0.95^age` so older bars contribute less mass (spec §4.5).

use crate::models::{HistoryBar, indicators::ChipDistribution};

const BUCKETS: usize = 100;
const DECAY: f64 = 0.95;
/// Buckets on each side of the main peak counted toward `concentration`.
const CONCENTRATION_HALF_WIDTH: usize = 20;

struct Histogram {
    low: f64,
    bucket_width: f64,
    mass: [f64; BUCKETS],
}

impl Histogram {
    fn bucket_price(&self, idx: usize) -> f64 {
        self.low + self.bucket_width * (idx as f64 + 0.5)
    }
}

fn build_histogram(bars: &[HistoryBar]) -> Option<Histogram> {
    if bars.is_empty() {
        return None;
    }
    let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    if !(high > low) {
        return None;
    }
    let bucket_width = (high - low) / BUCKETS as f64;

    let mut mass = [0.0; BUCKETS];
    for (age_from_end, bar) in bars.iter().rev().enumerate() {
        let weight = DECAY.powi(age_from_end as i32) * bar.volume;
        if weight <= 0.0 {
            continue;
        }
        let lo_idx = bucket_index(bar.low, low, bucket_width);
        let hi_idx = bucket_index(bar.high, low, bucket_width);
        let span = (hi_idx - lo_idx + 1) as f64;
        for idx in lo_idx..=hi_idx {
            mass[idx] += weight / span;
        }
    }

    Some(Histogram { low, bucket_width, mass })
}

fn bucket_index(price: f64, low: f64, bucket_width: f64) -> usize {
    let idx = ((price - low) / bucket_width) as isize;
    idx.clamp(0, BUCKETS as isize - 1) as usize
}

pub fn chip_distribution(bars: &[HistoryBar]) -> ChipDistribution {
    let Some(hist) = build_histogram(bars) else {
        return ChipDistribution::default();
    };
    let total_mass: f64 = hist.mass.iter().sum();
    if total_mass <= 0.0 {
        return ChipDistribution::default();
    }

    // Largest-mass bucket; ties broken toward the higher price.
    let main_peak_idx = (0..BUCKETS)
        .max_by(|&a, &b| {
            hist.mass[a]
                .partial_cmp(&hist.mass[b])
                .unwrap()
                .then(hist.bucket_price(a).partial_cmp(&hist.bucket_price(b)).unwrap())
        })
        .unwrap();
    let main_peak_price = hist.bucket_price(main_peak_idx);

    let lo = main_peak_idx.saturating_sub(CONCENTRATION_HALF_WIDTH);
    let hi = (main_peak_idx + CONCENTRATION_HALF_WIDTH).min(BUCKETS - 1);
    let concentration_mass: f64 = hist.mass[lo..=hi].iter().sum();
    let concentration = concentration_mass / total_mass;

    let average_cost =
        (0..BUCKETS).map(|i| hist.bucket_price(i) * hist.mass[i]).sum::<f64>() / total_mass;

    let current_price = bars.last().map_or(main_peak_price, |b| b.close);
    let profit_mass: f64 = (0..BUCKETS)
        .filter(|&i| hist.bucket_price(i) < current_price)
        .map(|i| hist.mass[i])
        .sum();
    let profit_ratio = profit_mass / total_mass;

    let support = (0..main_peak_idx)
        .filter(|&i| hist.bucket_price(i) < current_price)
        .max_by(|&a, &b| hist.mass[a].partial_cmp(&hist.mass[b]).unwrap())
        .map(|i| hist.bucket_price(i));
    let resistance = ((main_peak_idx + 1)..BUCKETS)
        .filter(|&i| hist.bucket_price(i) > current_price)
        .max_by(|&a, &b| hist.mass[a].partial_cmp(&hist.mass[b]).unwrap())
        .map(|i| hist.bucket_price(i));

    ChipDistribution {
        main_peak_price: Some(main_peak_price),
        average_cost: Some(average_cost),
        concentration: Some(concentration),
        support,
        resistance,
        profit_ratio: Some(profit_ratio),
    }
}
