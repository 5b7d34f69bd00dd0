//! The job record and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;

/// Job execution status.
///
/// Transitions are monotonic and one-directional:
/// `Queued -> Running -> Succeeded | Failed`, with the single shortcut
/// `Queued -> Failed` for submissions that never reach the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, waiting to be picked up by a worker.
    Queued,
    /// Currently being executed.
    Running,
    /// Handler completed; result holds its return value.
    Succeeded,
    /// Handler or submission failed; result holds the error description.
    Failed,
}

impl JobStatus {
    /// Position in the lifecycle order; terminal states share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Handler return value.
    Success { value: serde_json::Value },
    /// Error description (handler failure or transport failure).
    Failure { error: String },
}

impl JobOutcome {
    pub fn success(value: impl Into<serde_json::Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }
}

/// One unit of requested work.
///
/// The record store owns the authoritative copy; the transport only ever
/// carries the id, name, and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique id, immutable after submission.
    pub id: JobId,
    /// Human-supplied label, free-form.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Opaque argument blob handed to the handler.
    pub payload: serde_json::Value,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Present iff `status` is terminal.
    pub result: Option<JobOutcome>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a freshly-queued job record.
    pub fn new(
        id: JobId,
        name: impl Into<String>,
        description: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description,
            payload,
            status: JobStatus::Queued,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    fn transition(&mut self, to: JobStatus) -> DomainResult<()> {
        let from = self.status;
        let allowed = matches!(
            (from, to),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        );
        if !allowed {
            return Err(DomainError::InvalidTransition { from, to });
        }
        self.status = to;
        Ok(())
    }

    /// Mark the job as picked up by a worker.
    pub fn mark_running(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(at);
        Ok(())
    }

    /// Mark the job as completed with the handler's return value.
    pub fn mark_succeeded(
        &mut self,
        value: serde_json::Value,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.transition(JobStatus::Succeeded)?;
        self.result = Some(JobOutcome::Success { value });
        self.finished_at = Some(at);
        Ok(())
    }

    /// Mark the job as terminally failed with an error description.
    pub fn mark_failed(&mut self, error: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(JobStatus::Failed)?;
        self.result = Some(JobOutcome::Failure {
            error: error.into(),
        });
        self.finished_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn queued() -> Job {
        Job::new(JobId::new(), "Sample Task", None, serde_json::Value::Null)
    }

    #[test]
    fn happy_path_lifecycle() {
        let mut job = queued();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.result.is_none());

        job.mark_running(Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.is_some());
        assert!(job.result.is_none());

        job.mark_succeeded(serde_json::json!("done"), Utc::now())
            .unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.finished_at.is_some());
        assert_eq!(job.result, Some(JobOutcome::success("done")));
    }

    #[test]
    fn failure_from_running() {
        let mut job = queued();
        job.mark_running(Utc::now()).unwrap();
        job.mark_failed("boom", Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.result, Some(JobOutcome::failure("boom")));
    }

    #[test]
    fn queued_can_fail_directly() {
        // Submission path: publish failed before any worker saw the job.
        let mut job = queued();
        job.mark_failed("transport unavailable", Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut job = queued();
        job.mark_running(Utc::now()).unwrap();
        job.mark_succeeded(serde_json::Value::Null, Utc::now())
            .unwrap();

        assert!(job.mark_running(Utc::now()).is_err());
        assert!(job.mark_failed("late", Utc::now()).is_err());
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[test]
    fn running_twice_is_rejected() {
        let mut job = queued();
        job.mark_running(Utc::now()).unwrap();
        let err = job.mark_running(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DomainError::InvalidTransition {
                from: JobStatus::Running,
                to: JobStatus::Running,
            }
        ));
    }

    #[test]
    fn succeeded_requires_running() {
        let mut job = queued();
        assert!(job
            .mark_succeeded(serde_json::Value::Null, Utc::now())
            .is_err());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Run,
        Succeed,
        Fail,
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![Just(Step::Run), Just(Step::Succeed), Just(Step::Fail)]
    }

    proptest! {
        /// Whatever sequence of transition attempts is thrown at a job, the
        /// observed status ranks never decrease and no state is revisited
        /// after leaving it.
        #[test]
        fn status_rank_is_monotone(steps in proptest::collection::vec(step_strategy(), 0..12)) {
            let mut job = queued();
            let mut observed = vec![job.status];

            for step in steps {
                let _ = match step {
                    Step::Run => job.mark_running(Utc::now()),
                    Step::Succeed => job.mark_succeeded(serde_json::Value::Null, Utc::now()),
                    Step::Fail => job.mark_failed("e", Utc::now()),
                };
                observed.push(job.status);
            }

            for pair in observed.windows(2) {
                prop_assert!(pair[0].rank() <= pair[1].rank());
            }
            // Result present iff terminal.
            prop_assert_eq!(job.result.is_some(), job.status.is_terminal());
        }
    }
}
