//! Concurrency-safe registry of jobs.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::job::{Job, JobId, Outcome};

/// Single authority over job state.
///
/// One lock guards the whole map: readers share it, writers take it
/// exclusively, and `get` returns a copy so nobody observes a record
/// mid-mutation.
#[derive(Default)]
pub struct OperationStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl OperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading jobs map");
            PoisonError::into_inner(e)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing jobs map");
            PoisonError::into_inner(e)
        })
    }

    /// Insert a new in-progress job. Ids come from `Job::new` and never collide.
    pub fn register(&self, job: Job) {
        let mut jobs = self.write();
        if jobs.contains_key(&job.id) {
            tracing::error!(id = %job.id, "duplicate job id registered");
        }
        jobs.insert(job.id, job);
    }

    /// Snapshot of the job with this id.
    pub fn get(&self, id: JobId) -> Result<Job> {
        self.read().get(&id).cloned().ok_or(Error::JobNotFound(id))
    }

    /// Move a job to its terminal state and stamp `completed_at`.
    pub fn complete(&self, id: JobId, outcome: Outcome) -> Result<()> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        if !job.finish(outcome) {
            tracing::error!(%id, state = ?job.state, "job completed twice; keeping first outcome");
        }
        Ok(())
    }

    /// Ids of jobs that have not reached a terminal state.
    pub fn in_progress(&self) -> Vec<JobId> {
        self.read()
            .values()
            .filter(|job| !job.state.is_terminal())
            .map(|job| job.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
