//! `JobEngine`: the orchestrator behind `Start`/`Progress`/`Result`/`Cancel`
//! (spec §4.7). `start` validates and registers a job then returns
//! immediately; the actual work runs as a detached `tokio::spawn` task that
//! walks the stage pipeline and reports into `ProgressStore` as it goes —
//! mirroring the teacher's `execute_job_with_tracking` pattern (start/finish
//! bookkeeping wrapped around an arbitrary async body) adapted from a
//! fire-and-record cron job into a pollable, cancellable one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{JobFailure, StartError};
use crate::evaluator;
use crate::gateway::DataGateway;
use crate::models::{
    AnalyzedStats, CancelOutcome, FinalResult, Job, JobState, ProgressView, ResultOutcome, ScoredStock, Stage,
    StartRequest, StrategyDefinition, StrategyParameters, TickerData, UniverseFilter,
};
use crate::strategies;
use crate::universe;

use super::progress_store::ProgressStore;
use super::worker;

pub struct JobEngine {
    gateway: Arc<DataGateway>,
    store: Arc<ProgressStore>,
    max_concurrent_jobs: usize,
    default_worker_count: usize,
    max_worker_count: usize,
    job_soft_deadline: Duration,
    history_lookback_days: i64,
}

impl JobEngine {
    pub fn new(gateway: Arc<DataGateway>, store: Arc<ProgressStore>, config: &Config) -> Self {
        Self {
            gateway,
            store,
            max_concurrent_jobs: config.max_concurrent_jobs,
            default_worker_count: config.default_worker_count,
            max_worker_count: config.max_worker_count,
            job_soft_deadline: config.job_soft_deadline,
            history_lookback_days: config.history_lookback_days,
        }
    }

    /// Validates `request`, registers a new job, and spawns its worker task
    /// (spec §4.7.1). Returns the opaque job id the caller polls with.
    pub fn start(&self, request: StartRequest) -> Result<String, StartError> {
        let definition = strategies::find_strategy(&request.strategy_id)
            .ok_or_else(|| StartError::UnknownStrategy(request.strategy_id.clone()))?;

        let running = self.store.running_count();
        if running >= self.max_concurrent_jobs {
            return Err(StartError::CapacityExceeded { running, max: self.max_concurrent_jobs });
        }

        if request.max_stocks == 0 {
            return Err(StartError::InvalidParameters("max_stocks must be at least 1".to_string()));
        }

        let worker_count = if request.worker_count == 0 {
            self.default_worker_count
        } else {
            request.worker_count.min(self.max_worker_count)
        };

        let job_id = crate::models::job::new_job_id();
        let now = Utc::now();
        let job = Job {
            id: job_id.clone(),
            strategy_id: definition.id.clone(),
            state: JobState::Pending,
            started_at: now,
            started: std::time::Instant::now(),
            progress: ProgressView {
                job_id: job_id.clone(),
                state: JobState::Pending,
                stage: Stage::Initializing,
                percent: 0,
                total: 0,
                analyzed: 0,
                qualified: 0,
                skipped: 0,
                current_ticker: None,
                started_at: now,
                elapsed_seconds: 0.0,
            },
            result: None,
        };

        let cancel = CancellationToken::new();
        self.store.insert(job, cancel.clone());

        let gateway = self.gateway.clone();
        let store = self.store.clone();
        let soft_deadline = self.job_soft_deadline;
        let history_lookback_days = self.history_lookback_days;
        let min_score = if request.min_score > 0.0 { request.min_score } else { definition.min_score_default };
        let max_stocks = request.max_stocks;

        info!(job_id = %job_id, strategy = %definition.id, worker_count, "starting job");
        tokio::spawn(run_job(
            gateway,
            store,
            job_id.clone(),
            definition,
            request.parameters,
            request.filter,
            min_score,
            max_stocks,
            worker_count,
            soft_deadline,
            history_lookback_days,
            cancel,
        ));

        Ok(job_id)
    }

    pub async fn progress(&self, job_id: &str) -> Option<ProgressView> {
        self.store.progress(job_id).await
    }

    pub async fn result(&self, job_id: &str) -> ResultOutcome {
        self.store.result(job_id).await
    }

    pub async fn cancel(&self, job_id: &str) -> CancelOutcome {
        self.store.cancel(job_id).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_job(
    gateway: Arc<DataGateway>,
    store: Arc<ProgressStore>,
    job_id: String,
    definition: StrategyDefinition,
    params: StrategyParameters,
    filter: UniverseFilter,
    min_score: f64,
    max_stocks: usize,
    worker_count: usize,
    soft_deadline: Duration,
    history_lookback_days: i64,
    cancel: CancellationToken,
) {
    set_state(&store, &job_id, JobState::Running).await;
    set_progress(&store, &job_id, Stage::ResolvingUniverse, 0, 0, 0, 0).await;

    let roster = match gateway.reference_universe().await {
        Ok(r) => r,
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "reference universe fetch failed, failing job");
            finalize_failed(&store, &job_id, &definition.id, format!("reference universe unavailable: {e}")).await;
            return;
        }
    };
    let total_universe = roster.len();
    let analysis_set = universe::resolve(&roster, &filter);
    let analysis_set_size = analysis_set.len();

    set_progress(&store, &job_id, Stage::FetchingData, analysis_set_size, 0, 0, 0).await;

    let to = Utc::now().date_naive();
    let from = to - chrono::Duration::days(history_lookback_days);
    let deadline = tokio::time::Instant::now() + soft_deadline;
    let worker_count = worker_count.max(1);

    let mut join_set: JoinSet<worker::FetchOutcome> = JoinSet::new();
    let mut tickers_iter = analysis_set.into_iter();
    let mut fetched: Vec<TickerData> = Vec::with_capacity(analysis_set_size);
    let mut skipped = 0usize;

    loop {
        while join_set.len() < worker_count {
            if cancel.is_cancelled() || tokio::time::Instant::now() >= deadline {
                break;
            }
            let Some(ticker_ref) = tickers_iter.next() else { break };
            let gateway = gateway.clone();
            let cancel = cancel.clone();
            join_set.spawn(async move {
                worker::fetch_ticker_data(&gateway, &ticker_ref, from, to, &cancel).await
            });
        }

        if join_set.is_empty() {
            break;
        }

        if let Some(res) = join_set.join_next().await {
            match res {
                Ok(worker::FetchOutcome::Ready(data)) => fetched.push(data),
                Ok(worker::FetchOutcome::Skipped { .. }) => skipped += 1,
                Ok(worker::FetchOutcome::Cancelled) => {}
                Err(join_err) => {
                    warn!(job_id = %job_id, error = %join_err, "fetch task panicked");
                    skipped += 1;
                }
            }
            let processed = fetched.len() + skipped;
            set_progress(&store, &job_id, Stage::FetchingData, analysis_set_size, processed, 0, 0).await;
        }
    }

    let mut truncated = tickers_iter.len() > 0;

    let skip_threshold = (analysis_set_size / 2).max(50);
    if skipped > skip_threshold {
        warn!(
            job_id = %job_id,
            skipped,
            threshold = skip_threshold,
            "skip count exceeded data-quality threshold, failing job"
        );
        finalize_failed_with_counts(
            &store,
            &job_id,
            &definition.id,
            JobFailure::DataQualityBelowThreshold.to_string(),
            total_universe,
            analysis_set_size,
            fetched.len(),
            skipped,
        )
        .await;
        return;
    }

    set_progress(&store, &job_id, Stage::Analyzing, analysis_set_size, fetched.len() + skipped, 0, skipped).await;

    let median_return = median_20d_return(&fetched);
    let mut scored: Vec<ScoredStock> = Vec::with_capacity(fetched.len());
    for data in &fetched {
        if cancel.is_cancelled() {
            truncated = true;
            break;
        }
        let s = worker::evaluate_ticker(data, &definition, &params, min_score, median_return);
        scored.push(s);
        let qualified = scored.iter().filter(|s| s.qualified).count();
        set_progress(
            &store,
            &job_id,
            Stage::Analyzing,
            analysis_set_size,
            scored.len() + skipped,
            qualified,
            skipped,
        )
        .await;
    }

    set_progress(&store, &job_id, Stage::Ranking, analysis_set_size, scored.len() + skipped, 0, skipped).await;
    let mut qualified_stocks: Vec<ScoredStock> =
        scored.iter().filter(|s| s.qualified).cloned().collect();
    qualified_stocks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| b.market_cap.partial_cmp(&a.market_cap).unwrap())
            .then_with(|| a.code.cmp(&b.code))
    });
    let top_qualified: Vec<ScoredStock> = qualified_stocks.iter().take(max_stocks).cloned().collect();

    set_progress(&store, &job_id, Stage::Finalizing, analysis_set_size, scored.len() + skipped, qualified_stocks.len(), skipped).await;
    let stats = build_stats(&store, &job_id, &scored).await;
    let avg_score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|s| s.score).sum::<f64>() / scored.len() as f64
    };
    let max_score = scored.iter().map(|s| s.score).fold(0.0, f64::max);

    let cancelled = cancel.is_cancelled();
    let final_state = if cancelled { JobState::Cancelled } else { JobState::Completed };

    set_progress(&store, &job_id, Stage::Done, analysis_set_size, scored.len() + skipped, qualified_stocks.len(), skipped).await;

    let result = FinalResult {
        job_id: job_id.clone(),
        strategy_id: definition.id.clone(),
        state: final_state,
        started_at: store.progress(&job_id).await.map(|p| p.started_at).unwrap_or(Utc::now()),
        completed_at: Some(Utc::now()),
        total_universe,
        analysis_set_size,
        analyzed: scored.len(),
        qualified: qualified_stocks.len(),
        skipped,
        top_qualified,
        all_qualified: qualified_stocks,
        stats,
        avg_score,
        max_score,
        truncated,
        cancelled,
        fail_reason: None,
    };

    info!(
        job_id = %job_id,
        state = ?final_state,
        analyzed = result.analyzed,
        qualified = result.qualified,
        "job finished"
    );
    store.complete(&job_id, final_state, result).await;
}

fn median_20d_return(fetched: &[TickerData]) -> Option<f64> {
    let mut returns: Vec<f64> =
        fetched.iter().filter_map(|d| evaluator::return_20d(&d.history.closes())).collect();
    if returns.is_empty() {
        return None;
    }
    returns.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = returns.len() / 2;
    if returns.len() % 2 == 0 {
        Some((returns[mid - 1] + returns[mid]) / 2.0)
    } else {
        Some(returns[mid])
    }
}

async fn build_stats(store: &ProgressStore, job_id: &str, scored: &[ScoredStock]) -> AnalyzedStats {
    let mut grade_distribution = HashMap::new();
    let mut market_distribution = HashMap::new();
    let mut source_breakdown = HashMap::new();
    for s in scored {
        *grade_distribution.entry(s.grade.as_str().to_string()).or_insert(0) += 1;
        *market_distribution.entry(s.market.as_tag().to_string()).or_insert(0) += 1;
        *source_breakdown.entry(s.source.clone()).or_insert(0) += 1;
    }
    let elapsed_ms = match store.handle(job_id) {
        Some(handle) => handle.lock().await.elapsed().as_millis() as f64,
        None => 0.0,
    };
    let avg_time_per_stock_ms = if scored.is_empty() { 0.0 } else { elapsed_ms / scored.len() as f64 };
    AnalyzedStats { avg_time_per_stock_ms, grade_distribution, market_distribution, source_breakdown }
}

async fn set_state(store: &ProgressStore, job_id: &str, state: JobState) {
    if let Some(handle) = store.handle(job_id) {
        let mut job = handle.lock().await;
        job.state = state;
        job.progress.state = state;
    }
}

async fn set_progress(
    store: &ProgressStore,
    job_id: &str,
    stage: Stage,
    total: usize,
    processed: usize,
    qualified: usize,
    skipped: usize,
) {
    if let Some(handle) = store.handle(job_id) {
        let mut job = handle.lock().await;
        let floor = stage.floor_percent();
        // Only the fetch/analyze stages have a meaningful per-item fraction to
        // interpolate; later stages (ranking onward) just jump to their floor.
        let ceiling = match stage {
            Stage::FetchingData | Stage::Analyzing => Stage::Ranking.floor_percent(),
            _ => floor,
        };
        let percent = if total == 0 || ceiling <= floor {
            floor
        } else {
            let progressed = ((processed as f64 / total as f64) * f64::from(ceiling - floor)) as u8;
            floor.saturating_add(progressed).min(ceiling)
        };
        job.progress.stage = stage;
        job.progress.percent = percent.max(job.progress.percent);
        job.progress.total = total;
        job.progress.analyzed = processed;
        job.progress.qualified = qualified;
        job.progress.skipped = skipped;
        job.progress.elapsed_seconds = job.elapsed().as_secs_f64();
    }
}

async fn finalize_failed(store: &ProgressStore, job_id: &str, strategy_id: &str, reason: String) {
    finalize_failed_with_counts(store, job_id, strategy_id, reason, 0, 0, 0, 0).await;
}

#[allow(clippy::too_many_arguments)]
async fn finalize_failed_with_counts(
    store: &ProgressStore,
    job_id: &str,
    strategy_id: &str,
    reason: String,
    total_universe: usize,
    analysis_set_size: usize,
    analyzed: usize,
    skipped: usize,
) {
    let result = FinalResult {
        job_id: job_id.to_string(),
        strategy_id: strategy_id.to_string(),
        state: JobState::Failed,
        started_at: store.progress(job_id).await.map(|p| p.started_at).unwrap_or(Utc::now()),
        completed_at: Some(Utc::now()),
        total_universe,
        analysis_set_size,
        analyzed,
        qualified: 0,
        skipped,
        top_qualified: vec![],
        all_qualified: vec![],
        stats: AnalyzedStats::default(),
        avg_score: 0.0,
        max_score: 0.0,
        truncated: false,
        cancelled: false,
        fail_reason: Some(reason),
    };
    store.complete(job_id, JobState::Failed, result).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QuoteCache;
    use crate::models::{Fundamentals, History, HistoryBar, QuoteSnapshot, Ticker, TickerRef};
    use crate::provider::mock::{MockFixture, MockProvider};
    use chrono::{NaiveDate, NaiveDateTime};

    fn history_of(n: i64, base_close: f64) -> Vec<HistoryBar> {
        (1..=n)
            .map(|d| HistoryBar {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(d),
                open: base_close,
                high: base_close + 0.5,
                low: base_close - 0.5,
                close: base_close + d as f64 * 0.05,
                volume: 10_000.0,
            })
            .collect()
    }

    fn fixture_with(codes: &[(&str, f64, f64, f64)]) -> MockFixture {
        let mut fixture = MockFixture::default();
        for (code, pe, roe, market_cap) in codes {
            fixture.roster.push(TickerRef {
                ticker: Ticker::new(*code).unwrap(),
                name: format!("{code} Co"),
                industry: "banking".to_string(),
                listing_region: "Shanghai".to_string(),
                total_market_cap: *market_cap,
                free_float_cap: *market_cap / 2.0,
            });
            let close = 20.0;
            fixture.snapshots.insert(
                code.to_string(),
                QuoteSnapshot {
                    open: close,
                    high: close + 0.2,
                    low: close - 0.2,
                    close,
                    previous_close: close - 0.1,
                    volume: 5_000.0,
                    turnover_value: 50_000.0,
                    turnover_rate: 2.5,
                    session_time: NaiveDateTime::parse_from_str("2026-03-02 15:00:00", "%Y-%m-%d %H:%M:%S")
                        .unwrap(),
                },
            );
            fixture.history.insert(code.to_string(), history_of(70, close));
            fixture.fundamentals.insert(
                code.to_string(),
                Fundamentals { pe: Some(*pe), roe: Some(*roe), pb: Some(2.0), market_cap: Some(*market_cap), debt_ratio: Some(30.0), ..Default::default() },
            );
        }
        fixture
    }

    fn engine_with(fixture: MockFixture) -> JobEngine {
        let primary = Arc::new(MockProvider::new("primary", fixture));
        let secondary = Arc::new(MockProvider::new("secondary", MockFixture::default()));
        let cache = Arc::new(QuoteCache::new(1000));
        let config = Config::default();
        let gateway = Arc::new(DataGateway::new(primary, secondary, cache, &config));
        let store = Arc::new(ProgressStore::new(config.job_retention));
        JobEngine::new(gateway, store, &config)
    }

    fn default_request() -> StartRequest {
        StartRequest {
            strategy_id: "blue_chip_stable".to_string(),
            parameters: StrategyParameters::default(),
            filter: UniverseFilter::default(),
            min_score: 0.0,
            max_stocks: 10,
            worker_count: 2,
        }
    }

    #[tokio::test]
    async fn unknown_strategy_rejected_synchronously() {
        let engine = engine_with(MockFixture::default());
        let mut req = default_request();
        req.strategy_id = "does_not_exist".to_string();
        let err = engine.start(req).unwrap_err();
        assert!(matches!(err, StartError::UnknownStrategy(_)));
    }

    #[tokio::test]
    async fn zero_max_stocks_rejected_as_invalid_parameters() {
        let engine = engine_with(MockFixture::default());
        let mut req = default_request();
        req.max_stocks = 0;
        let err = engine.start(req).unwrap_err();
        assert!(matches!(err, StartError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn start_runs_to_completion_and_is_pollable() {
        let fixture = fixture_with(&[("600036", 10.0, 15.0, 3000.0), ("600519", 60.0, 20.0, 20000.0)]);
        let engine = engine_with(fixture);
        let job_id = engine.start(default_request()).unwrap();

        let mut result = None;
        for _ in 0..200 {
            if let ResultOutcome::Ready(r) = engine.result(&job_id).await {
                result = Some(r);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let result = result.expect("job should complete within the poll budget");
        assert_eq!(result.state, JobState::Completed);
        assert_eq!(result.analysis_set_size, 2);
        assert_eq!(result.analyzed, 2);
        // 600519's pe=60 violates the hard pe_max=25 bound.
        assert!(result.all_qualified.iter().any(|s| s.code == "600036"));
        assert!(!result.all_qualified.iter().any(|s| s.code == "600519"));
    }

    #[tokio::test]
    async fn progress_reaches_done_monotonically() {
        let fixture = fixture_with(&[("600036", 10.0, 15.0, 3000.0)]);
        let engine = engine_with(fixture);
        let job_id = engine.start(default_request()).unwrap();

        let mut last_percent = 0u8;
        for _ in 0..200 {
            if let Some(p) = engine.progress(&job_id).await {
                assert!(p.percent >= last_percent, "progress percent must never regress");
                last_percent = p.percent;
                if p.state == JobState::Completed {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(last_percent, 100);
    }

    #[tokio::test]
    async fn cancel_mid_run_marks_job_cancelled() {
        let mut fixture = fixture_with(&[("600036", 10.0, 15.0, 3000.0)]);
        fixture.call_delay = Duration::from_millis(50);
        let engine = engine_with(fixture);
        let job_id = engine.start(default_request()).unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(engine.cancel(&job_id).await, CancelOutcome::Acknowledged);

        let mut result = None;
        for _ in 0..200 {
            if let ResultOutcome::Ready(r) = engine.result(&job_id).await {
                result = Some(r);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let result = result.expect("cancelled job should still seal a result");
        assert!(result.cancelled);
    }

    #[test]
    fn ticker_data_history_helper_roundtrips() {
        let history = History { bars: history_of(5, 10.0) };
        assert_eq!(history.bars.len(), 5);
    }
}
