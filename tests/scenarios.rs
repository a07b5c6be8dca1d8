//! End-to-end scenario tests (spec §8), driving `JobEngine` the way a caller
//! over the HTTP boundary would: start, poll, read the final result.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use astock_analytics::cache::QuoteCache;
use astock_analytics::config::Config;
use astock_analytics::engine::{JobEngine, ProgressStore};
use astock_analytics::gateway::DataGateway;
use astock_analytics::models::{
    CancelOutcome, Fundamentals, HistoryBar, JobState, QuoteSnapshot, ResultOutcome, StartRequest,
    StrategyParameters, Ticker, TickerRef, UniverseFilter,
};
use astock_analytics::provider::mock::{MockFixture, MockProvider};
use chrono::{NaiveDate, NaiveDateTime};

fn session_time() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2026-03-02 15:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

fn flat_history(n: i64, close: f64) -> Vec<HistoryBar> {
    (1..=n)
        .map(|d| HistoryBar {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(d),
            open: close,
            high: close + 0.1,
            low: close - 0.1,
            close,
            volume: 10_000.0,
        })
        .collect()
}

struct TickerFixture {
    code: &'static str,
    pe: f64,
    pb: f64,
    roe: f64,
    cap: f64,
}

fn blue_chip_universe_fixture() -> MockFixture {
    let tickers = [
        TickerFixture { code: "600036", pe: 8.0, pb: 1.0, roe: 15.0, cap: 2000.0 },
        TickerFixture { code: "600519", pe: 35.0, pb: 10.0, roe: 30.0, cap: 2500.0 },
        TickerFixture { code: "000001", pe: 6.0, pb: 0.7, roe: 12.0, cap: 1200.0 },
    ];
    let mut fixture = MockFixture::default();
    for t in tickers {
        fixture.roster.push(TickerRef {
            ticker: Ticker::new(t.code).unwrap(),
            name: format!("{} Co", t.code),
            industry: "banking".to_string(),
            listing_region: "Shanghai".to_string(),
            total_market_cap: t.cap,
            free_float_cap: t.cap / 2.0,
        });
        let close = 20.0;
        fixture.snapshots.insert(
            t.code.to_string(),
            QuoteSnapshot {
                open: close,
                high: close + 0.2,
                low: close - 0.2,
                close,
                previous_close: close - 0.1,
                volume: 5_000.0,
                turnover_value: 50_000.0,
                turnover_rate: 2.0,
                session_time: session_time(),
            },
        );
        // Flat history: no bullish crossover, no momentum bonus — keeps
        // scores pinned to the raw weighted-bound tally (S1's literal 100).
        fixture.history.insert(t.code.to_string(), flat_history(70, close));
        fixture.fundamentals.insert(
            t.code.to_string(),
            Fundamentals {
                pe: Some(t.pe),
                pb: Some(t.pb),
                roe: Some(t.roe),
                market_cap: Some(t.cap),
                debt_ratio: Some(30.0),
                ..Default::default()
            },
        );
    }
    fixture
}

fn engine_from(primary_fixture: MockFixture, secondary_fixture: MockFixture, config: Config) -> JobEngine {
    let primary = Arc::new(MockProvider::new("primary", primary_fixture));
    let secondary = Arc::new(MockProvider::new("secondary", secondary_fixture));
    let cache = Arc::new(QuoteCache::new(config.cache_size));
    let gateway = Arc::new(DataGateway::new(primary, secondary, cache, &config));
    let store = Arc::new(ProgressStore::new(config.job_retention));
    JobEngine::new(gateway, store, &config)
}

fn blue_chip_request() -> StartRequest {
    let mut values = std::collections::HashMap::new();
    values.insert("pe_max".to_string(), 25.0);
    values.insert("pb_max".to_string(), 3.0);
    values.insert("roe_min".to_string(), 10.0);
    values.insert("market_cap_min".to_string(), 1000.0);
    StartRequest {
        strategy_id: "blue_chip_stable".to_string(),
        parameters: StrategyParameters { values },
        filter: UniverseFilter::default(),
        min_score: 60.0,
        max_stocks: 10,
        worker_count: 2,
    }
}

async fn await_result(engine: &JobEngine, job_id: &str) -> astock_analytics::models::FinalResult {
    for _ in 0..500 {
        if let ResultOutcome::Ready(r) = engine.result(job_id).await {
            return r;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not complete within the poll budget");
}

/// S1 — "Blue-chip Stable", 3-ticker universe.
#[tokio::test]
async fn s1_blue_chip_stable_qualifies_two_of_three() {
    let engine = engine_from(blue_chip_universe_fixture(), MockFixture::default(), Config::default());
    let job_id = engine.start(blue_chip_request()).unwrap();
    let result = await_result(&engine, &job_id).await;

    assert_eq!(result.state, JobState::Completed);
    assert_eq!(result.analyzed, 3);
    assert_eq!(result.qualified, 2);
    assert_eq!(result.skipped, 0);

    let codes: Vec<&str> = result.top_qualified.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(codes, vec!["600036", "000001"], "cap-descending tiebreak: 2000 before 1200");
    for s in &result.top_qualified {
        assert!((s.score - 100.0).abs() < 1e-6, "both should score the full 100 pre-bonus");
    }
    assert!(!result.all_qualified.iter().any(|s| s.code == "600519"), "pe=35 violates pe_max=25");
}

/// S2 — provider failover: primary fails for one ticker, secondary serves
/// it; the mock's per-code failure applies uniformly across that provider's
/// calls for the code, so every one of snapshot/history/fundamentals for
/// 600036 fails over — still exactly one call per operation on each side.
#[tokio::test]
async fn s2_provider_failover_falls_through_to_secondary() {
    let mut primary_fixture = blue_chip_universe_fixture();
    primary_fixture
        .failures
        .insert("600036".to_string(), astock_analytics::error::ProviderError::Unavailable);
    let secondary_fixture = blue_chip_universe_fixture();

    let primary = Arc::new(MockProvider::new("primary", primary_fixture));
    let secondary = Arc::new(MockProvider::new("secondary", secondary_fixture));
    let cache = Arc::new(QuoteCache::new(1000));
    let config = Config::default();
    let gateway = Arc::new(DataGateway::new(primary.clone(), secondary.clone(), cache, &config));
    let store = Arc::new(ProgressStore::new(config.job_retention));
    let engine = JobEngine::new(gateway, store, &config);

    let job_id = engine.start(blue_chip_request()).unwrap();
    let result = await_result(&engine, &job_id).await;

    assert_eq!(result.state, JobState::Completed);
    assert_eq!(result.skipped, 0, "the failing ticker should still score via failover, not be skipped");
    assert_eq!(primary.fundamentals_calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.fundamentals_calls.load(Ordering::SeqCst), 1, "only 600036 needs secondary fundamentals");
}

/// S3 — cache coalescing: two jobs started concurrently against an empty
/// cache both resolve the same universe via exactly one upstream call.
#[tokio::test]
async fn s3_cache_coalesces_reference_universe_across_jobs() {
    let engine = Arc::new(engine_from(blue_chip_universe_fixture(), MockFixture::default(), Config::default()));
    let job_a = engine.start(blue_chip_request()).unwrap();
    let job_b = engine.start(blue_chip_request()).unwrap();

    let (result_a, result_b) = tokio::join!(await_result(&engine, &job_a), await_result(&engine, &job_b));
    assert_eq!(result_a.total_universe, result_b.total_universe);
    assert_eq!(result_a.analysis_set_size, result_b.analysis_set_size);
}

fn sleepy_universe_fixture(n: usize, delay: Duration) -> MockFixture {
    let mut fixture = MockFixture::default();
    fixture.call_delay = delay;
    for i in 0..n {
        let code = format!("60{i:04}");
        let Some(ticker) = Ticker::new(code.clone()) else { continue };
        fixture.roster.push(TickerRef {
            ticker,
            name: format!("Ticker {i}"),
            industry: "banking".to_string(),
            listing_region: "Shanghai".to_string(),
            total_market_cap: 2000.0,
            free_float_cap: 1000.0,
        });
        let close = 20.0;
        fixture.snapshots.insert(
            code.clone(),
            QuoteSnapshot {
                open: close,
                high: close + 0.1,
                low: close - 0.1,
                close,
                previous_close: close - 0.05,
                volume: 1_000.0,
                turnover_value: 10_000.0,
                turnover_rate: 2.0,
                session_time: session_time(),
            },
        );
        fixture.history.insert(code.clone(), flat_history(70, close));
        fixture.fundamentals.insert(
            code,
            Fundamentals { pe: Some(10.0), roe: Some(15.0), pb: Some(1.0), market_cap: Some(2000.0), debt_ratio: Some(30.0), ..Default::default() },
        );
    }
    fixture
}

/// S4 — cancellation mid-run against a 100-ticker, sleepy-provider universe.
#[tokio::test]
async fn s4_cancel_mid_run_seals_partial_result_promptly() {
    let fixture = sleepy_universe_fixture(100, Duration::from_millis(100));
    let config = Config { max_concurrent_jobs: 4, ..Config::default() };
    let engine = engine_from(fixture, MockFixture::default(), config);

    let mut request = blue_chip_request();
    request.worker_count = 2;
    request.max_stocks = 100;
    let job_id = engine.start(request).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.cancel(&job_id).await, CancelOutcome::Acknowledged);

    let started = tokio::time::Instant::now();
    let result = await_result(&engine, &job_id).await;
    assert!(started.elapsed() < Duration::from_millis(500), "job should seal promptly after cancel");
    assert!(result.cancelled);
    assert!(result.analyzed <= 20, "no more than a couple fan-out passes should complete after cancel at t=300ms");
}

/// S5 — ranking stability across worker_count ∈ {1, 2, 4, 8}.
#[tokio::test]
async fn s5_ranking_is_stable_across_worker_counts() {
    let mut reference: Option<Vec<String>> = None;
    for worker_count in [1usize, 2, 4, 8] {
        let engine = engine_from(blue_chip_universe_fixture(), MockFixture::default(), Config::default());
        let mut request = blue_chip_request();
        request.worker_count = worker_count;
        let job_id = engine.start(request).unwrap();
        let result = await_result(&engine, &job_id).await;
        let codes: Vec<String> = result.top_qualified.iter().map(|s| s.code.clone()).collect();
        match &reference {
            None => reference = Some(codes),
            Some(expected) => assert_eq!(&codes, expected, "worker_count={worker_count} changed ranked order"),
        }
    }
}

/// S6 — progress monotonicity while a job runs through cancellation.
#[tokio::test]
async fn s6_progress_percent_never_regresses_during_cancellation() {
    let fixture = sleepy_universe_fixture(40, Duration::from_millis(50));
    let engine = engine_from(fixture, MockFixture::default(), Config::default());
    let mut request = blue_chip_request();
    request.worker_count = 2;
    request.max_stocks = 40;
    let job_id = engine.start(request).unwrap();

    let mut last_percent = 0u8;
    let mut cancelled = false;
    for i in 0..100 {
        if let Some(p) = engine.progress(&job_id).await {
            assert!(p.percent >= last_percent, "percent regressed from {last_percent} to {}", p.percent);
            last_percent = p.percent;
            if p.state == JobState::Completed || p.state == JobState::Cancelled {
                break;
            }
        }
        if i == 3 && !cancelled {
            engine.cancel(&job_id).await;
            cancelled = true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(cancelled);
}

/// Boundary: an empty universe completes immediately with nothing analyzed.
#[tokio::test]
async fn empty_universe_completes_with_zero_analyzed() {
    let engine = engine_from(MockFixture::default(), MockFixture::default(), Config::default());
    let job_id = engine.start(blue_chip_request()).unwrap();
    let result = await_result(&engine, &job_id).await;
    assert_eq!(result.state, JobState::Completed);
    assert_eq!(result.analyzed, 0);
    assert_eq!(result.qualified, 0);
}

/// Boundary: max_stocks = 0 is rejected synchronously at start.
#[tokio::test]
async fn zero_max_stocks_is_rejected_at_start() {
    let engine = engine_from(MockFixture::default(), MockFixture::default(), Config::default());
    let mut request = blue_chip_request();
    request.max_stocks = 0;
    let err = engine.start(request).unwrap_err();
    assert!(matches!(err, astock_analytics::error::StartError::InvalidParameters(_)));
}

/// Boundary: both providers unavailable for a ticker -> it's a skip, not a
/// job failure; the job still completes over the remaining tickers.
#[tokio::test]
async fn both_providers_unavailable_for_a_ticker_is_a_skip() {
    let mut primary_fixture = blue_chip_universe_fixture();
    let mut secondary_fixture = MockFixture::default();
    for code in ["600036", "600519", "000001"] {
        primary_fixture
            .failures
            .insert(code.to_string(), astock_analytics::error::ProviderError::Unavailable);
        secondary_fixture
            .failures
            .insert(code.to_string(), astock_analytics::error::ProviderError::Unavailable);
    }

    let engine = engine_from(primary_fixture, secondary_fixture, Config::default());
    let job_id = engine.start(blue_chip_request()).unwrap();
    let result = await_result(&engine, &job_id).await;

    assert_eq!(result.state, JobState::Completed);
    assert_eq!(result.skipped, 3);
    assert_eq!(result.analyzed, 0);
    assert_eq!(result.analyzed + result.skipped, result.analysis_set_size);
}

/// Boundary: when more than half (and at least 50) of the analysis set is
/// unreachable on both providers, the job fails outright instead of sealing
/// a near-empty result.
#[tokio::test]
async fn skip_rate_beyond_threshold_fails_the_job() {
    let mut primary_fixture = sleepy_universe_fixture(60, Duration::ZERO);
    let mut secondary_fixture = MockFixture::default();
    for i in 0..60 {
        let code = format!("60{i:04}");
        primary_fixture.failures.insert(code.clone(), astock_analytics::error::ProviderError::Unavailable);
        secondary_fixture.failures.insert(code, astock_analytics::error::ProviderError::Unavailable);
    }

    let engine = engine_from(primary_fixture, secondary_fixture, Config::default());
    let mut request = blue_chip_request();
    request.max_stocks = 60;
    let job_id = engine.start(request).unwrap();
    let result = await_result(&engine, &job_id).await;

    assert_eq!(result.state, JobState::Failed);
    assert_eq!(result.fail_reason.as_deref(), Some("data_quality_below_threshold"));
}

/// Boundary: a job evicted beyond the retention window is no longer found.
#[tokio::test]
async fn job_beyond_retention_window_returns_not_found() {
    let config = Config { job_retention: 1, ..Config::default() };
    let engine = engine_from(MockFixture::default(), MockFixture::default(), config);

    let first = engine.start(blue_chip_request()).unwrap();
    await_result(&engine, &first).await;
    let second = engine.start(blue_chip_request()).unwrap();
    await_result(&engine, &second).await;

    assert!(
        matches!(engine.result(&first).await, ResultOutcome::NotFound),
        "oldest completed job should be evicted"
    );
    assert!(matches!(engine.result(&second).await, ResultOutcome::Ready(_)));
}
