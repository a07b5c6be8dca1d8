//! Process-wide configuration, loaded from the environment the same way the
//! teacher's `CachedStore::from_env` does (`data/cache.rs`): documented
//! defaults in a markdown table, `std::env::var` with a fallback per field,
//! no external config-management framework.

use std::time::Duration;

/// | Env Var | Default | Purpose |
/// |---|---|---|
/// | `PRIMARY_PROVIDER_TOKEN` | (none) | Auth token for the primary upstream |
/// | `SECONDARY_PROVIDER_ENDPOINT` | (none) | Base URL override for the secondary upstream |
/// | `CACHE_SIZE` | `10000` | Max entries held by `QuoteCache` |
/// | `CACHE_TTL_REFERENCE_SECS` | `3600` | TTL for the reference roster |
/// | `CACHE_TTL_FUNDAMENTALS_SECS` | `900` | TTL for fundamentals |
/// | `CACHE_TTL_SNAPSHOT_SECS` | `300` | TTL for latest-session snapshots |
/// | `RATE_LIMIT_RPS_PRIMARY` | `5` | Token-bucket refill rate for the primary provider |
/// | `RATE_LIMIT_RPS_SECONDARY` | `3` | Token-bucket refill rate for the secondary provider |
/// | `DEFAULT_WORKER_COUNT` | `5` | Worker pool size when a request omits `worker_count` |
/// | `MAX_WORKER_COUNT` | `16` | Upper clamp on `worker_count` |
/// | `MAX_CONCURRENT_JOBS` | `4` | Ceiling on simultaneously running jobs |
/// | `JOB_RETENTION` | `64` | Completed jobs retained by `ProgressStore` |
/// | `JOB_SOFT_DEADLINE_SECS` | `300` | Soft wall-clock budget before a running job truncates and seals (spec §5) |
/// | `HISTORY_LOOKBACK_DAYS` | `180` | Days of OHLCV history fetched per ticker |
/// | `HTTP_BIND_ADDR` | `0.0.0.0:8080` | Address the HTTP boundary binds to |
#[derive(Debug, Clone)]
pub struct Config {
    pub primary_provider_token: Option<String>,
    pub secondary_provider_endpoint: Option<String>,
    pub cache_size: usize,
    pub cache_ttl_reference: Duration,
    pub cache_ttl_fundamentals: Duration,
    pub cache_ttl_snapshot: Duration,
    pub rate_limit_rps_primary: u32,
    pub rate_limit_rps_secondary: u32,
    pub default_worker_count: usize,
    pub max_worker_count: usize,
    pub max_concurrent_jobs: usize,
    pub job_retention: usize,
    pub job_soft_deadline: Duration,
    pub history_lookback_days: i64,
    pub http_bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_provider_token: None,
            secondary_provider_endpoint: None,
            cache_size: 10_000,
            cache_ttl_reference: Duration::from_secs(3600),
            cache_ttl_fundamentals: Duration::from_secs(900),
            cache_ttl_snapshot: Duration::from_secs(300),
            rate_limit_rps_primary: 5,
            rate_limit_rps_secondary: 3,
            default_worker_count: 5,
            max_worker_count: 16,
            max_concurrent_jobs: 4,
            job_retention: 64,
            job_soft_deadline: Duration::from_secs(300),
            history_lookback_days: 180,
            http_bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Build from environment variables, falling back to the defaults above
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            primary_provider_token: std::env::var("PRIMARY_PROVIDER_TOKEN").ok(),
            secondary_provider_endpoint: std::env::var("SECONDARY_PROVIDER_ENDPOINT").ok(),
            cache_size: env_usize("CACHE_SIZE", defaults.cache_size),
            cache_ttl_reference: env_secs("CACHE_TTL_REFERENCE_SECS", defaults.cache_ttl_reference),
            cache_ttl_fundamentals: env_secs(
                "CACHE_TTL_FUNDAMENTALS_SECS",
                defaults.cache_ttl_fundamentals,
            ),
            cache_ttl_snapshot: env_secs("CACHE_TTL_SNAPSHOT_SECS", defaults.cache_ttl_snapshot),
            rate_limit_rps_primary: env_u32("RATE_LIMIT_RPS_PRIMARY", defaults.rate_limit_rps_primary),
            rate_limit_rps_secondary: env_u32(
                "RATE_LIMIT_RPS_SECONDARY",
                defaults.rate_limit_rps_secondary,
            ),
            default_worker_count: env_usize("DEFAULT_WORKER_COUNT", defaults.default_worker_count),
            max_worker_count: env_usize("MAX_WORKER_COUNT", defaults.max_worker_count),
            max_concurrent_jobs: env_usize("MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs),
            job_retention: env_usize("JOB_RETENTION", defaults.job_retention),
            job_soft_deadline: env_secs("JOB_SOFT_DEADLINE_SECS", defaults.job_soft_deadline),
            history_lookback_days: env_usize("HISTORY_LOOKBACK_DAYS", 180) as i64,
            http_bind_addr: std::env::var("HTTP_BIND_ADDR").unwrap_or(defaults.http_bind_addr),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
