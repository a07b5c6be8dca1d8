//! Deterministic, call-counting `QuoteProvider` used throughout the test
//! suite — the same role the teacher's pack fills with `borsa-mock` (a
//! fixture connector with canned, deterministic responses instead of network
//! I/O). Lets tests assert on exact call counts (single-flight, failover)
//! and control per-call latency/failure without touching the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ProviderError;
use crate::models::{Fundamentals, HistoryBar, QuoteSnapshot, Ticker, TickerRef};

use super::QuoteProvider;

#[derive(Clone, Default)]
pub struct MockFixture {
    pub roster: Vec<TickerRef>,
    pub snapshots: HashMap<String, QuoteSnapshot>,
    pub history: HashMap<String, Vec<HistoryBar>>,
    pub fundamentals: HashMap<String, Fundamentals>,
    /// Tickers for which this provider always fails, with the given error.
    pub failures: HashMap<String, ProviderError>,
    /// Artificial per-call latency, for cancellation/timeout scenarios.
    pub call_delay: Duration,
}

pub struct MockProvider {
    label: &'static str,
    fixture: Mutex<MockFixture>,
    pub roster_calls: AtomicU32,
    pub snapshot_calls: AtomicU32,
    pub history_calls: AtomicU32,
    pub fundamentals_calls: AtomicU32,
}

impl MockProvider {
    pub fn new(label: &'static str, fixture: MockFixture) -> Self {
        Self {
            label,
            fixture: Mutex::new(fixture),
            roster_calls: AtomicU32::new(0),
            snapshot_calls: AtomicU32::new(0),
            history_calls: AtomicU32::new(0),
            fundamentals_calls: AtomicU32::new(0),
        }
    }

    pub fn total_calls(&self) -> u32 {
        self.roster_calls.load(Ordering::SeqCst)
            + self.snapshot_calls.load(Ordering::SeqCst)
            + self.history_calls.load(Ordering::SeqCst)
            + self.fundamentals_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let d = self.fixture.lock().unwrap().call_delay;
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl QuoteProvider for MockProvider {
    async fn load_reference_universe(&self) -> Result<Vec<TickerRef>, ProviderError> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.fixture.lock().unwrap().roster.clone())
    }

    async fn fetch_snapshot_batch(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<String, QuoteSnapshot>, ProviderError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let fixture = self.fixture.lock().unwrap();
        let mut out = HashMap::with_capacity(tickers.len());
        for t in tickers {
            if let Some(err) = fixture.failures.get(&t.code) {
                return Err(err.clone());
            }
            if let Some(s) = fixture.snapshots.get(&t.code) {
                out.insert(t.code.clone(), *s);
            }
        }
        Ok(out)
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<HistoryBar>, ProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let fixture = self.fixture.lock().unwrap();
        if let Some(err) = fixture.failures.get(&ticker.code) {
            return Err(err.clone());
        }
        Ok(fixture.history.get(&ticker.code).cloned().unwrap_or_default())
    }

    async fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, ProviderError> {
        self.fundamentals_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let fixture = self.fixture.lock().unwrap();
        if let Some(err) = fixture.failures.get(&ticker.code) {
            return Err(err.clone());
        }
        Ok(fixture.fundamentals.get(&ticker.code).copied().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        self.label
    }
}
