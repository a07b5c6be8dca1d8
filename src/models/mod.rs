pub mod fundamentals;
pub mod indicators;
pub mod job;
pub mod quote;
pub mod scored;
pub mod strategy;
pub mod ticker;

pub use fundamentals::Fundamentals;
pub use indicators::IndicatorSet;
pub use job::{
    AnalyzedStats, CancelOutcome, FinalResult, Job, JobState, ProgressView, ResultOutcome, Stage, StartRequest,
    UniverseFilter,
};
pub use quote::{History, HistoryBar, QuoteSnapshot};
pub use scored::{Grade, ScoredStock};
pub use strategy::{BoundKind, ParamSpec, StrategyDefinition, StrategyParameters};
pub use ticker::{Market, Ticker, TickerRef};

/// A ticker's merged view across providers + derived indicators, handed to
/// the `StrategyEvaluator`. Assembled per-ticker by a `JobEngine` worker.
#[derive(Debug, Clone)]
pub struct TickerData {
    pub ticker_ref: TickerRef,
    pub snapshot: QuoteSnapshot,
    pub history: History,
    pub fundamentals: Fundamentals,
    pub indicators: IndicatorSet,
    /// Name of the provider that served this ticker's data, or `"mixed"` if
    /// the three fetches didn't all land on the same one.
    pub source: String,
}
