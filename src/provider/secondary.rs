//! Secondary upstream provider — fallback vendor used when the primary is
//! unavailable, rate-limited, or returns malformed data (spec §4.2). Modeled
//! after a Sina-style quote feed: simpler per-ticker endpoints, no batch
//! snapshot call, so `fetch_snapshot_batch` fans out one request per ticker.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::{Fundamentals, HistoryBar, QuoteSnapshot, Ticker, TickerRef};

use super::{validate_snapshot, QuoteProvider};

const TIMEOUT: Duration = Duration::from_secs(30);
const REFERENCE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SecondaryProvider {
    client: Client,
    base_url: String,
}

impl SecondaryProvider {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| "https://hq.sina.example/api".to_string()),
        }
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<String, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|_| ProviderError::Unavailable)?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(path.to_string()));
        }
        if !resp.status().is_success() {
            return Err(ProviderError::Unavailable);
        }
        resp.text().await.map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    code: String,
    name: String,
    industry: String,
    region: String,
    total_cap: f64,
    float_cap: f64,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    pre_close: f64,
    volume: f64,
    turnover: f64,
    turnover_rate: f64,
    time: chrono::NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[async_trait]
impl QuoteProvider for SecondaryProvider {
    async fn load_reference_universe(&self) -> Result<Vec<TickerRef>, ProviderError> {
        let body = self.get("/roster", REFERENCE_TIMEOUT).await?;
        let rows: Vec<RosterRow> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let ticker = Ticker::new(&r.code)?;
                Some(TickerRef {
                    ticker,
                    name: r.name,
                    industry: r.industry,
                    listing_region: r.region,
                    total_market_cap: r.total_cap,
                    free_float_cap: r.float_cap,
                })
            })
            .collect())
    }

    async fn fetch_snapshot_batch(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<String, QuoteSnapshot>, ProviderError> {
        let fetches = tickers.iter().map(|t| async move {
            let body = self.get(&format!("/quote?code={}", t.code), TIMEOUT).await?;
            let row: SnapshotRow =
                serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
            let snapshot = QuoteSnapshot {
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                previous_close: row.pre_close,
                volume: row.volume,
                turnover_value: row.turnover,
                turnover_rate: row.turnover_rate,
                session_time: row.time,
            };
            validate_snapshot(&t.code, &snapshot)?;
            Ok::<_, ProviderError>((t.code.clone(), snapshot))
        });
        let results = join_all(fetches).await;
        let mut out = HashMap::with_capacity(results.len());
        for r in results {
            let (code, snapshot) = r?;
            out.insert(code, snapshot);
        }
        Ok(out)
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HistoryBar>, ProviderError> {
        let body = self
            .get(&format!("/history?code={}&from={from}&to={to}", ticker.code), TIMEOUT)
            .await?;
        let rows: Vec<HistoryRow> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|r| HistoryBar {
                date: r.date,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            })
            .collect())
    }

    async fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, ProviderError> {
        let body = self.get(&format!("/fundamentals?code={}", ticker.code), TIMEOUT).await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "secondary"
    }
}
