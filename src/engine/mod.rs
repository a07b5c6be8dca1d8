//! The strategy execution engine: `JobEngine` orchestrates, `ProgressStore`
//! holds state, `worker` runs the per-ticker pipeline (spec §4.7).

pub mod job_engine;
pub mod progress_store;
pub mod worker;

pub use job_engine::JobEngine;
pub use progress_store::ProgressStore;
