//! Per-ticker pipeline, split into the two stages `JobEngine` reports as
//! distinct progress stages (spec §4.7.4): `fetch_ticker_data` (fetch +
//! indicators, I/O-bound, run inside the `FetchingData` stage's fan-out) and
//! `evaluate` (pure CPU, run inside `Analyzing` once the whole batch's
//! 20-bar-return median is known). Cancellation is checked between stages
//! rather than mid-stage, so an in-flight HTTP call always runs to
//! completion instead of being aborted half-way.

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::evaluator;
use crate::gateway::DataGateway;
use crate::models::{History, ScoredStock, StrategyDefinition, StrategyParameters, TickerData, TickerRef};

pub enum FetchOutcome {
    Ready(TickerData),
    Skipped { code: String, reason: String },
    Cancelled,
}

pub async fn fetch_ticker_data(
    gateway: &DataGateway,
    ticker_ref: &TickerRef,
    history_from: NaiveDate,
    history_to: NaiveDate,
    cancel: &CancellationToken,
) -> FetchOutcome {
    if cancel.is_cancelled() {
        return FetchOutcome::Cancelled;
    }

    let ticker = ticker_ref.ticker.clone();
    let (snapshot, history, fundamentals) = tokio::join!(
        gateway.snapshot(&ticker),
        gateway.history(&ticker, history_from, history_to),
        gateway.fundamentals(&ticker),
    );

    let snapshot = match snapshot {
        Ok(s) => s,
        Err(e) => return skip(ticker_ref, format!("snapshot unavailable: {e}")),
    };
    let history = match history {
        Ok(h) => h,
        Err(e) => return skip(ticker_ref, format!("history unavailable: {e}")),
    };
    let fundamentals = match fundamentals {
        Ok(f) => f,
        Err(e) => return skip(ticker_ref, format!("fundamentals unavailable: {e}")),
    };

    if cancel.is_cancelled() {
        return FetchOutcome::Cancelled;
    }

    // Sources usually agree since both come from the same failover call per
    // fetch, but a mid-flight provider switch between the three calls is
    // possible — label those ticks "mixed" rather than picking one.
    let source = if snapshot.source == history.source && history.source == fundamentals.source {
        snapshot.source.to_string()
    } else {
        "mixed".to_string()
    };

    let history = History { bars: history.value.clone() };
    let indicators = crate::indicators::compute_indicator_set(&history);

    FetchOutcome::Ready(TickerData {
        ticker_ref: ticker_ref.clone(),
        snapshot: snapshot.value,
        history,
        fundamentals: fundamentals.value,
        indicators,
        source,
    })
}

fn skip(ticker_ref: &TickerRef, reason: String) -> FetchOutcome {
    FetchOutcome::Skipped { code: ticker_ref.ticker.code.clone(), reason }
}

/// Scores one already-fetched ticker. Pure and synchronous — `JobEngine`
/// calls this directly rather than spawning a task per ticker for this
/// stage.
pub fn evaluate_ticker(
    data: &TickerData,
    definition: &StrategyDefinition,
    params: &StrategyParameters,
    min_score: f64,
    industry_median_return_20d: Option<f64>,
) -> ScoredStock {
    evaluator::evaluate(data, definition, params, min_score, industry_median_return_20d)
}
