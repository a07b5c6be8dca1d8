//! `QuoteProvider`: the capability boundary to upstream market-data vendors
//! (spec §4.1). Two concrete implementations (`primary`, `secondary`) plus a
//! deterministic `mock` used by tests — grounded in the teacher's
//! `EodhdProvider` (`data/eodhd.rs`: reqwest client, rate-limited retries,
//! serde-deserialized API responses) and the `MarketMakerAdapter` trait
//! pattern from the wider example pack (one async trait, many backends).

pub mod mock;
pub mod primary;
pub mod secondary;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ProviderError;
use crate::models::{Fundamentals, HistoryBar, QuoteSnapshot, Ticker, TickerRef};

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn load_reference_universe(&self) -> Result<Vec<TickerRef>, ProviderError>;

    async fn fetch_snapshot_batch(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<String, QuoteSnapshot>, ProviderError>;

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HistoryBar>, ProviderError>;

    async fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, ProviderError>;

    /// Stable label used in logs and in `DataGateway`'s source-breakdown stats.
    fn name(&self) -> &'static str;
}

/// Reject records the gateway considers physically impossible, per spec
/// §4.2's normalization rule — shared by both provider implementations so the
/// rejection logic isn't duplicated per vendor.
pub fn validate_snapshot(symbol: &str, snapshot: &QuoteSnapshot) -> Result<(), ProviderError> {
    if snapshot.close <= 0.0 || snapshot.volume < 0.0 {
        return Err(ProviderError::Malformed(format!(
            "{symbol}: close={} volume={}",
            snapshot.close, snapshot.volume
        )));
    }
    Ok(())
}
