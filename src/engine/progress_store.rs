//! `ProgressStore`: holds every job's live/terminal state (spec §4.8).
//! Jobs are looked up by id from the HTTP boundary while a `JobEngine` task
//! is concurrently mutating the same entry, so each record is behind its own
//! `tokio::sync::Mutex` rather than one lock over the whole store — readers
//! polling one job never block a worker updating another.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::models::{CancelOutcome, FinalResult, Job, JobState, ProgressView, ResultOutcome};

pub struct ProgressStore {
    jobs: DashMap<String, Arc<Mutex<Job>>>,
    cancel_tokens: DashMap<String, CancellationToken>,
    retention: usize,
    /// Insertion order of jobs that have reached a terminal state, oldest
    /// first — the only ones eligible for eviction (spec §4.8: running jobs
    /// are never evicted).
    completed_order: Mutex<VecDeque<String>>,
}

impl ProgressStore {
    pub fn new(retention: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            cancel_tokens: DashMap::new(),
            retention: retention.max(1),
            completed_order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|e| match e.value().try_lock() {
                Ok(job) => !job.state.is_terminal(),
                // Locked means a worker is actively mutating it — running.
                Err(_) => true,
            })
            .count()
    }

    pub fn insert(&self, job: Job, cancel: CancellationToken) {
        let id = job.id.clone();
        self.jobs.insert(id.clone(), Arc::new(Mutex::new(job)));
        self.cancel_tokens.insert(id, cancel);
    }

    pub fn cancel_token(&self, job_id: &str) -> Option<CancellationToken> {
        self.cancel_tokens.get(job_id).map(|e| e.clone())
    }

    pub fn handle(&self, job_id: &str) -> Option<Arc<Mutex<Job>>> {
        self.jobs.get(job_id).map(|e| e.clone())
    }

    pub async fn progress(&self, job_id: &str) -> Option<ProgressView> {
        let handle = self.handle(job_id)?;
        let job = handle.lock().await;
        Some(job.progress.clone())
    }

    /// `NotFound` if the job id is unknown, `NotReady` if it exists but
    /// hasn't reached a terminal state yet, `Ready` once it has.
    pub async fn result(&self, job_id: &str) -> ResultOutcome {
        let Some(handle) = self.handle(job_id) else { return ResultOutcome::NotFound };
        let job = handle.lock().await;
        match job.result.clone() {
            Some(r) => ResultOutcome::Ready(r),
            None => ResultOutcome::NotReady,
        }
    }

    /// Requests cancellation of a running job. `AlreadyTerminal` covers both
    /// a job that finished on its own and one cancelled by an earlier call —
    /// cancel is a no-op past completion, not an error (spec §4.7.6).
    pub async fn cancel(&self, job_id: &str) -> CancelOutcome {
        let Some(handle) = self.handle(job_id) else { return CancelOutcome::NotFound };
        let mut job = handle.lock().await;
        if job.state.is_terminal() {
            return CancelOutcome::AlreadyTerminal;
        }
        if let Some(token) = self.cancel_tokens.get(job_id) {
            token.cancel();
        }
        if job.state.can_transition_to(JobState::Cancelled) {
            job.state = JobState::Cancelled;
        }
        CancelOutcome::Acknowledged
    }

    /// Marks a job terminal with its final result, then evicts the oldest
    /// completed job if the store is over `retention`.
    pub async fn complete(&self, job_id: &str, state: JobState, result: FinalResult) {
        if let Some(handle) = self.handle(job_id) {
            let mut job = handle.lock().await;
            job.state = state;
            job.progress.state = state;
            job.result = Some(result);
        }

        let victim = {
            let mut order = self.completed_order.lock().await;
            order.push_back(job_id.to_string());
            if order.len() > self.retention {
                order.pop_front()
            } else {
                None
            }
        };
        if let Some(victim) = victim {
            self.jobs.remove(&victim);
            self.cancel_tokens.remove(&victim);
        }
    }
}
