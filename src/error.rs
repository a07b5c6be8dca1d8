//! Error taxonomy (spec §7). Each capability boundary gets its own enum so
//! callers can match on the kinds spec.md names explicitly, rather than a
//! single catch-all like the teacher's `anyhow::Result` everywhere — the
//! engine needs to distinguish *skip this ticker* from *fail this job* from
//! *reject this request*, which a flat `anyhow::Error` can't express cheaply.

use thiserror::Error;

/// Errors a `QuoteProvider` operation can fail with (spec §4.1).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider unavailable")]
    Unavailable,
    #[error("provider rate limited the request")]
    RateLimited,
    #[error("ticker not found: {0}")]
    NotFound(String),
    #[error("response could not be parsed: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Ordering used by `DataGateway` to pick the "stronger" of two failures
    /// when both providers fail (spec §4.2): Unavailable > Malformed >
    /// RateLimited > NotFound.
    fn severity_rank(&self) -> u8 {
        match self {
            ProviderError::Unavailable => 3,
            ProviderError::Malformed(_) => 2,
            ProviderError::RateLimited => 1,
            ProviderError::NotFound(_) => 0,
        }
    }

    pub fn stronger(self, other: ProviderError) -> ProviderError {
        if self.severity_rank() >= other.severity_rank() {
            self
        } else {
            other
        }
    }
}

/// Errors surfaced by `DataGateway` — identical shape to `ProviderError`
/// today, kept distinct so the gateway can attach normalization failures
/// without reusing provider-specific variants.
pub type GatewayError = ProviderError;

/// Synchronous failures at `JobEngine::start` (spec §4.7.1, §7).
#[derive(Debug, Clone, Error)]
pub enum StartError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("invalid universe filter: {0}")]
    BadFilter(String),
    #[error("too many concurrent jobs ({running}/{max})")]
    CapacityExceeded { running: usize, max: usize },
}

/// Failure reasons recorded on a job's `FinalResult.fail_reason` (spec §7).
/// The orchestrator itself never returns a `Result` to its caller — a failed
/// job is a field on the result, not a propagated error.
#[derive(Debug, Clone, Error)]
pub enum JobFailure {
    #[error("data_quality_below_threshold")]
    DataQualityBelowThreshold,
    #[error("internal orchestrator error: {0}")]
    Internal(String),
}
