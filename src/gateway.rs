//! `DataGateway`: the provider-agnostic view the rest of the engine talks
//! to (spec §4.2). Owns failover between `primary` and `secondary`, the
//! per-provider token buckets, and routes every call through `QuoteCache`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::warn;

use crate::cache::QuoteCache;
use crate::config::Config;
use crate::error::GatewayError;
use crate::models::{Fundamentals, HistoryBar, QuoteSnapshot, Ticker, TickerRef};
use crate::provider::QuoteProvider;
use crate::ratelimit::TokenBucket;

pub struct DataGateway {
    primary: Arc<dyn QuoteProvider>,
    secondary: Arc<dyn QuoteProvider>,
    primary_bucket: TokenBucket,
    secondary_bucket: TokenBucket,
    cache: Arc<QuoteCache>,
    cache_ttl_reference: Duration,
    cache_ttl_fundamentals: Duration,
    cache_ttl_snapshot: Duration,
}

/// A value paired with the name of the provider that actually served it —
/// lets callers build the data-source breakdown in `JobEngine`'s analyzed
/// stats (spec §4.7.5) without re-deriving it from call counters.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub value: T,
    pub source: &'static str,
}

/// Calls fail fast against the rate limiter relative to the upstream
/// timeout itself — no point burning the whole 30s budget waiting on a
/// bucket that's clearly empty.
const RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

impl DataGateway {
    pub fn new(
        primary: Arc<dyn QuoteProvider>,
        secondary: Arc<dyn QuoteProvider>,
        cache: Arc<QuoteCache>,
        config: &Config,
    ) -> Self {
        Self {
            primary,
            secondary,
            primary_bucket: TokenBucket::new(config.rate_limit_rps_primary),
            secondary_bucket: TokenBucket::new(config.rate_limit_rps_secondary),
            cache,
            cache_ttl_reference: config.cache_ttl_reference,
            cache_ttl_fundamentals: config.cache_ttl_fundamentals,
            cache_ttl_snapshot: config.cache_ttl_snapshot,
        }
    }

    /// Try `primary` first; on Unavailable/RateLimited/Malformed fall
    /// through to `secondary`. Returns the first success tagged with the name
    /// of whichever provider served it, or the stronger of the two failures
    /// if both fail (spec §4.2).
    async fn with_failover<T, F, Fut>(&self, call: F) -> Result<(T, &'static str), GatewayError>
    where
        F: Fn(Arc<dyn QuoteProvider>) -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let primary_err = match self.primary_bucket.acquire(RATE_LIMIT_WAIT).await {
            Ok(()) => match call(self.primary.clone()).await {
                Ok(v) => return Ok((v, self.primary.name())),
                Err(e) => e,
            },
            Err(e) => e,
        };
        warn!(provider = "primary", error = %primary_err, "falling over to secondary");

        let secondary_err = match self.secondary_bucket.acquire(RATE_LIMIT_WAIT).await {
            Ok(()) => match call(self.secondary.clone()).await {
                Ok(v) => return Ok((v, self.secondary.name())),
                Err(e) => e,
            },
            Err(e) => e,
        };
        Err(primary_err.stronger(secondary_err))
    }

    pub async fn reference_universe(&self) -> Result<Arc<Vec<TickerRef>>, GatewayError> {
        self.cache
            .get_or_load("reference_universe", self.cache_ttl_reference, || async {
                let (roster, _source) =
                    self.with_failover(|p| async move { p.load_reference_universe().await }).await?;
                Ok(roster)
            })
            .await
    }

    pub async fn snapshot(&self, ticker: &Ticker) -> Result<Arc<Sourced<QuoteSnapshot>>, GatewayError> {
        let key = format!("snapshot:{}", ticker.code);
        let ticker = ticker.clone();
        self.cache
            .get_or_load(key, self.cache_ttl_snapshot, || async move {
                let (batch, source) = self
                    .with_failover(|p| {
                        let ticker = ticker.clone();
                        async move { p.fetch_snapshot_batch(&[ticker]).await }
                    })
                    .await?;
                let value = batch
                    .get(&ticker.code)
                    .copied()
                    .ok_or_else(|| GatewayError::NotFound(ticker.code.clone()))?;
                Ok(Sourced { value, source })
            })
            .await
    }

    pub async fn snapshot_batch(
        &self,
        tickers: &[Ticker],
    ) -> Result<HashMap<String, QuoteSnapshot>, GatewayError> {
        // Batch calls bypass the per-ticker cache entry and go straight to
        // the provider — callers that want caching should prefer `snapshot`.
        let (batch, _source) = self
            .with_failover(|p| {
                let tickers = tickers.to_vec();
                async move { p.fetch_snapshot_batch(&tickers).await }
            })
            .await?;
        Ok(batch)
    }

    pub async fn history(
        &self,
        ticker: &Ticker,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Arc<Sourced<Vec<HistoryBar>>>, GatewayError> {
        let key = format!("history:{}:{from}:{to}", ticker.code);
        let ticker = ticker.clone();
        self.cache
            .get_or_load(key, self.cache_ttl_fundamentals, || async move {
                let (value, source) = self
                    .with_failover(|p| {
                        let ticker = ticker.clone();
                        async move { p.fetch_history(&ticker, from, to).await }
                    })
                    .await?;
                Ok(Sourced { value, source })
            })
            .await
    }

    pub async fn fundamentals(&self, ticker: &Ticker) -> Result<Arc<Sourced<Fundamentals>>, GatewayError> {
        let key = format!("fundamentals:{}", ticker.code);
        let ticker = ticker.clone();
        self.cache
            .get_or_load(key, self.cache_ttl_fundamentals, || async move {
                let (value, source) = self
                    .with_failover(|p| {
                        let ticker = ticker.clone();
                        async move { p.fetch_fundamentals(&ticker).await }
                    })
                    .await?;
                Ok(Sourced { value, source })
            })
            .await
    }
}
