//! In-process ledger of running conversion tasks.
//!
//! Guarantees at most one pipeline task per job id within this process. The
//! claim is released through an RAII guard, so a panicking or short-circuited
//! task still frees its slot.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct JobTracker {
    running: Arc<Mutex<HashSet<Uuid>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `job_id`. Returns `None` when a task for it is already running.
    pub fn begin(&self, job_id: Uuid) -> Option<RunningJob> {
        let mut running = self.lock();
        if running.insert(job_id) {
            Some(RunningJob {
                tracker: self.clone(),
                job_id,
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, job_id: Uuid) -> bool {
        self.lock().contains(&job_id)
    }

    pub fn running_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        // A poisoned lock only means a holder panicked mid-update; the set of
        // ids is still coherent, so keep going rather than poison the process.
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Claim on a job id, released on drop.
pub struct RunningJob {
    tracker: JobTracker,
    job_id: Uuid,
}

impl Drop for RunningJob {
    fn drop(&mut self) {
        self.tracker.lock().remove(&self.job_id);
    }
}
