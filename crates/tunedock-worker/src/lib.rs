//! Tunedock Worker Library
//!
//! Runs accepted conversion jobs to completion: one fire-and-forget tokio
//! task per job, bounded by a semaphore, with every failure funneled into a
//! terminal Error transition on the job record.

pub mod orchestrator;
pub mod scratch;
pub mod tracker;

pub use orchestrator::Orchestrator;
pub use tracker::{JobTracker, RunningJob};
