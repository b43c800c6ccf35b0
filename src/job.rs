use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::FileSnapshot;

/// Unique identifier for a job, also the protocol request id.
pub type JobId = Uuid;

/// What a job does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Upload,
    Delete,
}

/// Job state. `InProgress` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        self != JobState::InProgress
    }
}

/// How a job execution ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Succeeded; uploads carry the written file.
    Completed(Option<FileSnapshot>),
    Failed(String),
}

/// A tracked remote mutation.
///
/// Records handed out by the store are snapshots; mutating one has no effect
/// on the stored job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    /// Absolute remote path the job acts on.
    pub target: String,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
    /// Set on the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    /// Present iff `state == Failed`.
    pub error: Option<String>,
    /// Present iff `state == Completed` and `kind == Upload`.
    pub result: Option<FileSnapshot>,
}

impl Job {
    /// A fresh in-progress job with a new random id.
    pub fn new(kind: JobKind, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target: target.into(),
            state: JobState::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            result: None,
        }
    }

    /// Apply the terminal transition. Returns `false` (and leaves the record
    /// untouched) if the job already finished.
    pub(crate) fn finish(&mut self, outcome: Outcome) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match outcome {
            Outcome::Completed(result) => {
                self.state = JobState::Completed;
                self.result = match self.kind {
                    JobKind::Upload => result,
                    JobKind::Delete => None,
                };
            }
            Outcome::Failed(error) => {
                self.state = JobState::Failed;
                self.error = Some(error);
            }
        }
        self.completed_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> FileSnapshot {
        FileSnapshot {
            path: "/upload/a.txt".into(),
            content: "hi".into(),
            permissions: "0644".into(),
            size: 2,
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn new_job_is_in_progress() {
        let job = Job::new(JobKind::Upload, "/upload/a.txt");
        assert_eq!(job.state, JobState::InProgress);
        assert!(job.completed_at.is_none());
        assert_ne!(job.id, Job::new(JobKind::Upload, "/upload/a.txt").id);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = Job::new(JobKind::Upload, "/upload/a.txt");
        assert!(job.finish(Outcome::Failed("write failed".into())));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("write failed"));

        assert!(!job.finish(Outcome::Completed(Some(snap()))));
        assert_eq!(job.state, JobState::Failed);
        assert!(job.result.is_none());
    }

    #[test]
    fn delete_jobs_never_carry_a_result() {
        let mut job = Job::new(JobKind::Delete, "/upload/a.txt");
        job.finish(Outcome::Completed(Some(snap())));
        assert_eq!(job.state, JobState::Completed);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_some());
    }
}
