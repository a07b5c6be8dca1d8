//! Primary upstream provider. Modeled after an Eastmoney-style quote/
//! fundamentals vendor — bulk endpoints for the reference roster and
//! snapshot batches, per-ticker endpoints for history and fundamentals.
//!
//! Request/retry shape follows the teacher's `EodhdProvider`
//! (`data/eodhd.rs`): a shared `reqwest::Client`, a fixed timeout, bounded
//! retries with backoff on 429/5xx.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::{Fundamentals, HistoryBar, QuoteSnapshot, Ticker, TickerRef};

use super::{validate_snapshot, QuoteProvider};

const BASE_URL: &str = "https://push2.eastmoney.example/api";
const TIMEOUT: Duration = Duration::from_secs(30);
const REFERENCE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;

pub struct PrimaryProvider {
    client: Client,
    token: Option<String>,
}

impl PrimaryProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            token,
        }
    }

    async fn get_with_retries(&self, url: &str, timeout: Duration) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            let mut req = self.client.get(url).timeout(timeout);
            if let Some(token) = &self.token {
                req = req.header("X-Api-Token", token.clone());
            }
            let resp = req.send().await;
            match resp {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= MAX_RETRIES {
                        return Err(ProviderError::RateLimited);
                    }
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Ok(r) if r.status().is_server_error() => {
                    if attempt >= MAX_RETRIES {
                        return Err(ProviderError::Unavailable);
                    }
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Ok(r) if r.status().is_success() => {
                    return r
                        .text()
                        .await
                        .map_err(|e| ProviderError::Malformed(e.to_string()));
                }
                Ok(r) if r.status() == StatusCode::NOT_FOUND => {
                    return Err(ProviderError::NotFound(url.to_string()));
                }
                Ok(_) => return Err(ProviderError::Unavailable),
                Err(e) if e.is_timeout() => return Err(ProviderError::Unavailable),
                Err(e) => return Err(ProviderError::Unavailable.stronger(
                    if e.is_decode() {
                        ProviderError::Malformed(e.to_string())
                    } else {
                        ProviderError::Unavailable
                    },
                )),
            }
        }
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
    code: String,
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
impl QuoteProvider for PrimaryProvider {
    async fn load_reference_universe(&self) -> Result<Vec<TickerRef>, ProviderError> {
        let url = format!("{BASE_URL}/roster");
        let body = self.get_with_retries(&url, REFERENCE_TIMEOUT).await?;
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
        let codes: Vec<&str> = tickers.iter().map(|t| t.code.as_str()).collect();
        let url = format!("{BASE_URL}/snapshots?codes={}", codes.join(","));
        let body = self.get_with_retries(&url, TIMEOUT).await?;
        let rows: Vec<SnapshotRow> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
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
            validate_snapshot(&row.code, &snapshot)?;
            out.insert(row.code, snapshot);
        }
        Ok(out)
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HistoryBar>, ProviderError> {
        let url = format!("{BASE_URL}/history?code={}&from={from}&to={to}", ticker.code);
        let body = self.get_with_retries(&url, TIMEOUT).await?;
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
        let url = format!("{BASE_URL}/fundamentals?code={}", ticker.code);
        let body = self.get_with_retries(&url, TIMEOUT).await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "primary"
    }
}
