//! Job identity, lifecycle state, filters, and the progress/result views
//! returned across the boundary (spec §3, §4.7, §6).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::scored::ScoredStock;

/// Opaque, sortable job id. Not a real ULID (no `ulid` crate in the stack) —
/// a UUIDv4 renders the same "opaque id, safe to log and pass around"
/// contract spec.md asks for.
pub fn new_job_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Enforces the state graph in spec §4.7.2 — no transition out of a
    /// terminal state, and no transition that skips a forward edge.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// (markets, industries) filter resolved by `UniverseResolver`. The literal
/// token `"ALL"` in either set means "no restriction on that axis".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseFilter {
    pub markets: Vec<String>,
    pub industries: Vec<String>,
}

impl UniverseFilter {
    pub const ALL: &'static str = "ALL";

    pub fn matches_market(&self, tag: &str) -> bool {
        self.markets.is_empty()
            || self.markets.iter().any(|m| m == Self::ALL)
            || self.markets.iter().any(|m| m == tag)
    }

    pub fn matches_industry(&self, industry: &str) -> bool {
        self.industries.is_empty()
            || self.industries.iter().any(|i| i == Self::ALL)
            || self.industries.iter().any(|i| i == industry)
    }
}

/// One of the stages reported in `ProgressView.stage` (spec §4.7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Initializing,
    ResolvingUniverse,
    FetchingData,
    Analyzing,
    Ranking,
    Finalizing,
    Done,
}

impl Stage {
    /// Progress-percent floor for this stage, so the bar never regresses
    /// across stage transitions even before `analyzed_count` moves.
    pub fn floor_percent(self) -> u8 {
        match self {
            Stage::Initializing => 0,
            Stage::ResolvingUniverse => 2,
            Stage::FetchingData => 5,
            Stage::Analyzing => 5,
            Stage::Ranking => 95,
            Stage::Finalizing => 98,
            Stage::Done => 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressView {
    pub job_id: String,
    pub state: JobState,
    pub stage: Stage,
    pub percent: u8,
    pub total: usize,
    pub analyzed: usize,
    pub qualified: usize,
    pub skipped: usize,
    pub current_ticker: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzedStats {
    pub avg_time_per_stock_ms: f64,
    pub grade_distribution: HashMap<String, usize>,
    pub market_distribution: HashMap<String, usize>,
    pub source_breakdown: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub job_id: String,
    pub strategy_id: String,
    pub state: JobState,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_universe: usize,
    pub analysis_set_size: usize,
    pub analyzed: usize,
    pub qualified: usize,
    pub skipped: usize,
    pub top_qualified: Vec<ScoredStock>,
    pub all_qualified: Vec<ScoredStock>,
    pub stats: AnalyzedStats,
    pub avg_score: f64,
    pub max_score: f64,
    pub truncated: bool,
    pub cancelled: bool,
    pub fail_reason: Option<String>,
}

/// Outcome of polling a job's result (spec §4.7.1: `Result(job_id) →
/// FinalResult | NotReady | NotFound`).
#[derive(Debug, Clone)]
pub enum ResultOutcome {
    Ready(FinalResult),
    NotReady,
    NotFound,
}

/// Outcome of requesting cancellation (spec §4.7.1: `Cancel(job_id) →
/// Acknowledged | AlreadyTerminal`), plus `NotFound` for an unknown id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Acknowledged,
    AlreadyTerminal,
    NotFound,
}

/// Validated request accepted by `JobEngine::start`.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub strategy_id: String,
    pub parameters: super::strategy::StrategyParameters,
    pub filter: UniverseFilter,
    pub min_score: f64,
    pub max_stocks: usize,
    pub worker_count: usize,
}

/// Internal job record held by `ProgressStore`. `started` is a monotonic
/// clock handle for elapsed-time computation; wall-clock timestamps live in
/// `FinalResult`/`ProgressView` for display.
pub struct Job {
    pub id: String,
    pub strategy_id: String,
    pub state: JobState,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub started: Instant,
    pub progress: ProgressView,
    pub result: Option<FinalResult>,
}

impl Job {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_graph_forbids_regression() {
        assert!(JobState::Pending.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Completed));
        assert!(!JobState::Completed.can_transition_to(JobState::Running));
        assert!(!JobState::Running.can_transition_to(JobState::Pending));
        assert!(!JobState::Cancelled.can_transition_to(JobState::Running));
    }

    #[test]
    fn terminal_states_are_closed() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn universe_filter_all_token_matches_everything() {
        let f = UniverseFilter {
            markets: vec!["ALL".to_string()],
            industries: vec![],
        };
        assert!(f.matches_market("primary"));
        assert!(f.matches_market("secondary"));
        assert!(f.matches_industry("banking"));
    }

    #[test]
    fn universe_filter_exact_match() {
        let f = UniverseFilter {
            markets: vec!["primary".to_string()],
            industries: vec!["banking".to_string()],
        };
        assert!(f.matches_market("primary"));
        assert!(!f.matches_market("secondary"));
        assert!(f.matches_industry("banking"));
        assert!(!f.matches_industry("steel"));
    }

    #[test]
    fn stage_floor_is_monotonic_over_stage_order() {
        let stages = [
            Stage::Initializing,
            Stage::ResolvingUniverse,
            Stage::FetchingData,
            Stage::Analyzing,
            Stage::Ranking,
            Stage::Finalizing,
            Stage::Done,
        ];
        let mut last = 0;
        for s in stages {
            assert!(s.floor_percent() >= last);
            last = s.floor_percent();
        }
    }
}
