//! `StrategyEvaluator`: scores one ticker's merged data against a resolved
//! strategy binding (spec §4.6).
//!
//! Scoring proceeds in three steps: (1) every `Hard` bound must be satisfied
//! or the ticker is rejected outright; (2) a weighted raw score is built from
//! how many of the remaining (`Soft`) bounds are satisfied; (3) two bonus
//! checks — technical alignment and relative momentum — can add up to 15
//! points before the final score is clipped to `[0, 100]`.

use crate::indicators::macd::macd_series;
use crate::models::indicators::IndicatorSet;
use crate::models::{BoundKind, ParamSpec, ScoredStock, StrategyDefinition, StrategyParameters, TickerData};

/// Bullish-crossover lookback for the technical-alignment bonus.
const CROSSOVER_LOOKBACK: usize = 3;
const TECHNICAL_BONUS: f64 = 10.0;
const MOMENTUM_BONUS: f64 = 5.0;
const MOMENTUM_WINDOW: usize = 20;

fn resolve_field(field: &str, data: &TickerData) -> Option<f64> {
    if let Some(v) = data.fundamentals.get(field) {
        return Some(v);
    }
    match field {
        "close" => Some(data.snapshot.close),
        "open" => Some(data.snapshot.open),
        "turnover_rate" => Some(data.snapshot.turnover_rate),
        "turnover_value" => Some(data.snapshot.turnover_value),
        "volume" => Some(data.snapshot.volume),
        "percent_change" => Some(data.snapshot.percent_change()),
        "rsi14" => data.indicators.rsi14,
        "macd_histogram" => data.indicators.macd.histogram,
        "macd_dif" => data.indicators.macd.dif,
        "kdj_k" => data.indicators.kdj.k,
        "kdj_d" => data.indicators.kdj.d,
        "kdj_j" => data.indicators.kdj.j,
        _ => None,
    }
}

/// 20-bar percent return ending at the latest close, or `None` if fewer than
/// `MOMENTUM_WINDOW + 1` bars exist. `pub(crate)` so `JobEngine` can compute
/// the batch's median return for the momentum bonus (spec §4.6 step 3).
pub(crate) fn return_20d(closes: &[f64]) -> Option<f64> {
    if closes.len() <= MOMENTUM_WINDOW {
        return None;
    }
    let latest = *closes.last()?;
    let base = closes[closes.len() - 1 - MOMENTUM_WINDOW];
    if base == 0.0 {
        return None;
    }
    Some((latest - base) / base * 100.0)
}

fn technical_alignment_bonus(data: &TickerData) -> f64 {
    let closes = data.history.closes();
    let macd_hist = macd_series(&closes);
    let crossover = IndicatorSet::has_recent_bullish_crossover(&macd_hist, CROSSOVER_LOOKBACK);
    let above_ma20 = match data.indicators.moving_averages.ma20 {
        Some(ma20) => data.snapshot.close > ma20,
        None => false,
    };
    if crossover && above_ma20 { TECHNICAL_BONUS } else { 0.0 }
}

fn momentum_bonus(data: &TickerData, industry_median_return_20d: Option<f64>) -> f64 {
    match (return_20d(&data.history.closes()), industry_median_return_20d) {
        (Some(r), Some(median)) if r > median => MOMENTUM_BONUS,
        _ => 0.0,
    }
}

/// Evaluates one ticker against `definition`/`params`. `industry_median_return_20d`
/// is the 20-bar return median across the job's analysis set, supplied by the
/// caller once per batch (spec §4.6 step 3's "industry median" comparison).
pub fn evaluate(
    data: &TickerData,
    definition: &StrategyDefinition,
    params: &StrategyParameters,
    min_score: f64,
    industry_median_return_20d: Option<f64>,
) -> ScoredStock {
    let resolved = params.resolve(definition);

    let mut hard_bound_violated = false;
    for spec in resolved.iter().filter(|s| s.kind == BoundKind::Hard) {
        match resolve_field(&spec.field, data) {
            Some(v) if spec.satisfied_by(v) => {}
            Some(_) => hard_bound_violated = true,
            None => return rejected(data, format!("{} is missing", spec.field)),
        }
    }

    let (achieved_weight, total_weight, satisfied_count) = weighted_tally(&resolved, data);
    let raw_score = if total_weight > 0.0 {
        100.0 * achieved_weight / total_weight
    } else {
        100.0
    };

    let bonus = technical_alignment_bonus(data) + momentum_bonus(data, industry_median_return_20d);
    let score = (raw_score + bonus).clamp(0.0, 100.0);
    let qualified = score >= min_score && !hard_bound_violated;

    let reason = if qualified {
        format!("qualified at score {score:.1} ({satisfied_count}/{} bounds satisfied)", resolved.len())
    } else if hard_bound_violated {
        format!("score {score:.1} but a hard bound was violated")
    } else {
        format!("score {score:.1} below threshold {min_score:.1}")
    };

    ScoredStock {
        code: data.ticker_ref.ticker.code.clone(),
        market: data.ticker_ref.ticker.market,
        name: data.ticker_ref.name.clone(),
        industry: data.ticker_ref.industry.clone(),
        market_cap: data.ticker_ref.total_market_cap,
        score,
        grade: crate::models::Grade::from_score(score),
        qualified,
        reason,
        satisfied_count,
        indicators: data.indicators,
        close: data.snapshot.close,
        percent_change: data.snapshot.percent_change(),
        source: data.source.clone(),
    }
}

fn weighted_tally(resolved: &[ParamSpec], data: &TickerData) -> (f64, f64, usize) {
    let mut achieved = 0.0;
    let mut total = 0.0;
    let mut satisfied_count = 0;
    for spec in resolved {
        let weight = spec.effective_weight();
        total += weight;
        let satisfied = resolve_field(&spec.field, data).is_some_and(|v| spec.satisfied_by(v));
        if satisfied {
            achieved += weight;
            satisfied_count += 1;
        }
    }
    (achieved, total, satisfied_count)
}

fn rejected(data: &TickerData, reason: String) -> ScoredStock {
    ScoredStock {
        code: data.ticker_ref.ticker.code.clone(),
        market: data.ticker_ref.ticker.market,
        name: data.ticker_ref.name.clone(),
        industry: data.ticker_ref.industry.clone(),
        market_cap: data.ticker_ref.total_market_cap,
        score: 0.0,
        grade: crate::models::Grade::from_score(0.0),
        qualified: false,
        reason,
        satisfied_count: 0,
        indicators: data.indicators,
        close: data.snapshot.close,
        percent_change: data.snapshot.percent_change(),
        source: data.source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::compute_indicator_set;
    use crate::models::{Fundamentals, History, HistoryBar, QuoteSnapshot, Ticker, TickerRef};
    use crate::strategies::value::blue_chip_stable;
    use chrono::{NaiveDate, NaiveDateTime};

    fn history_rising(n: u32) -> History {
        History {
            bars: (1..=n)
                .map(|d| HistoryBar {
                    date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(d as i64),
                    open: 10.0 + d as f64 * 0.1,
                    high: 10.2 + d as f64 * 0.1,
                    low: 9.9 + d as f64 * 0.1,
                    close: 10.0 + d as f64 * 0.1,
                    volume: 10_000.0,
                })
                .collect(),
        }
    }

    fn ticker_data(code: &str, pe: Option<f64>, roe: Option<f64>, market_cap: Option<f64>) -> TickerData {
        let history = history_rising(70);
        let close = history.latest().unwrap().close;
        TickerData {
            ticker_ref: TickerRef {
                ticker: Ticker::new(code).unwrap(),
                name: "Test Co".to_string(),
                industry: "banking".to_string(),
                listing_region: "Shanghai".to_string(),
                total_market_cap: market_cap.unwrap_or(2000.0),
                free_float_cap: 1000.0,
            },
            snapshot: QuoteSnapshot {
                open: close,
                high: close + 0.1,
                low: close - 0.1,
                close,
                previous_close: close - 0.05,
                volume: 10_000.0,
                turnover_value: 100_000.0,
                turnover_rate: 3.0,
                session_time: NaiveDateTime::parse_from_str("2026-03-02 15:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            },
            indicators: compute_indicator_set(&history),
            fundamentals: Fundamentals { pe, roe, pb: Some(2.0), market_cap, debt_ratio: Some(40.0), ..Default::default() },
            history,
            source: "primary".to_string(),
        }
    }

    #[test]
    fn hard_bound_violation_disqualifies_but_still_scores_remaining_bounds() {
        let def = blue_chip_stable();
        let params = StrategyParameters::default();
        // pe=60 violates the hard pe_max=25 bound; roe/market_cap (hard) and
        // pb/debt_ratio (soft) all pass, so the weighted tally still owes a
        // partial score instead of the ticker being zeroed out.
        let data = ticker_data("600519", Some(60.0), Some(20.0), Some(5000.0));
        let scored = evaluate(&data, &def, &params, 60.0, None);
        assert!(!scored.qualified, "a violated hard bound must disqualify regardless of score");
        assert!(scored.score >= 60.0, "remaining satisfied bounds must still contribute weight");
        assert_eq!(scored.satisfied_count, 4, "only the pe bound should fail");
    }

    #[test]
    fn missing_hard_field_rejects_with_reason() {
        let def = blue_chip_stable();
        let params = StrategyParameters::default();
        let data = ticker_data("600036", None, Some(15.0), Some(3000.0));
        let scored = evaluate(&data, &def, &params, 60.0, None);
        assert!(!scored.qualified);
        assert!(scored.reason.contains("missing"));
    }

    #[test]
    fn passing_all_bounds_qualifies_above_threshold() {
        let def = blue_chip_stable();
        let params = StrategyParameters::default();
        let data = ticker_data("600036", Some(10.0), Some(15.0), Some(3000.0));
        let scored = evaluate(&data, &def, &params, 50.0, None);
        assert!(scored.qualified);
        assert!(scored.score >= 50.0);
    }

    #[test]
    fn score_never_exceeds_100() {
        let def = blue_chip_stable();
        let params = StrategyParameters::default();
        let data = ticker_data("600036", Some(5.0), Some(25.0), Some(5000.0));
        let scored = evaluate(&data, &def, &params, 0.0, Some(-50.0));
        assert!(scored.score <= 100.0);
    }
}
