//! Submission and status services.
//!
//! The submission service is the only writer of fresh records: it validates
//! the request, persists a `Queued` record, then publishes to the transport.
//! A publish failure is folded back into the record as a terminal `Failed`
//! outcome instead of leaving an orphaned `Queued` record, so the caller
//! still gets an id it can poll.

use chrono::Utc;
use tracing::{debug, warn};

use jobrelay_core::{Job, JobId};

use crate::store::{JobStore, JobUpdate, StoreError};
use crate::transport::{Delivery, QueueTransport};

/// A validated-on-entry submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub name: String,
    pub description: Option<String>,
    pub payload: Option<serde_json::Value>,
}

impl SubmitRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            payload: None,
        }
    }
}

/// Submission failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    /// Bad input; nothing was recorded.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The record store rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Accepts job submissions: assign id, persist `Queued`, publish.
pub struct SubmissionService<S, T> {
    store: S,
    transport: T,
}

impl<S, T> SubmissionService<S, T>
where
    S: JobStore,
    T: QueueTransport,
{
    pub fn new(store: S, transport: T) -> Self {
        Self { store, transport }
    }

    /// Submit a named job. Returns the stored record; its status is
    /// `Queued`, or already `Failed` when the transport rejected the
    /// publish.
    pub fn submit(&self, request: SubmitRequest) -> Result<Job, SubmitError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(SubmitError::Validation("name must not be empty".to_string()));
        }

        let job = Job::new(
            JobId::new(),
            name,
            request.description,
            request.payload.unwrap_or(serde_json::Value::Null),
        );
        let id = job.id;

        self.store.put(job.clone())?;

        let delivery = Delivery {
            job_id: id,
            name: job.name.clone(),
            payload: job.payload.clone(),
        };

        match self.transport.publish(delivery) {
            Ok(()) => {
                debug!(job_id = %id, name = %job.name, "job queued");
                Ok(job)
            }
            Err(e) => {
                // The record exists; don't strand it in Queued forever.
                warn!(job_id = %id, error = %e, "publish failed, marking job failed");
                let failed = self.store.update(
                    id,
                    JobUpdate::Failed {
                        error: format!("transport error: {e}"),
                        at: Utc::now(),
                    },
                )?;
                Ok(failed)
            }
        }
    }
}

/// Read path for job status. Pure read, no side effects.
pub struct StatusService<S> {
    store: S,
}

impl<S> StatusService<S>
where
    S: JobStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current record for `id`, or `NotFound`.
    pub fn status(&self, id: JobId) -> Result<Job, StoreError> {
        self.store.get(id)
    }

    /// Known jobs, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        self.store.list(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jobrelay_core::{JobOutcome, JobStatus};

    use crate::store::InMemoryJobStore;
    use crate::transport::InMemoryTransport;

    fn services() -> (
        std::sync::Arc<InMemoryJobStore>,
        std::sync::Arc<InMemoryTransport>,
        SubmissionService<std::sync::Arc<InMemoryJobStore>, std::sync::Arc<InMemoryTransport>>,
        StatusService<std::sync::Arc<InMemoryJobStore>>,
    ) {
        let store = InMemoryJobStore::arc();
        let transport = InMemoryTransport::arc();
        let submission = SubmissionService::new(store.clone(), transport.clone());
        let status = StatusService::new(store.clone());
        (store, transport, submission, status)
    }

    #[test]
    fn submit_persists_queued_then_publishes() {
        let (_store, transport, submission, status) = services();

        let job = submission
            .submit(SubmitRequest::new("Sample Task"))
            .unwrap();

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.name, "Sample Task");
        assert!(job.result.is_none());
        assert_eq!(transport.depth(), 1);

        // Status is immediately visible, never NotFound.
        let seen = status.status(job.id).unwrap();
        assert_eq!(seen.id, job.id);
        assert_eq!(seen.status, JobStatus::Queued);
    }

    #[test]
    fn submitted_ids_are_unique() {
        let (_store, _transport, submission, _status) = services();
        let a = submission.submit(SubmitRequest::new("a")).unwrap();
        let b = submission.submit(SubmitRequest::new("b")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn blank_name_is_rejected_without_a_record() {
        let (store, _transport, submission, _status) = services();

        for name in ["", "   "] {
            assert!(matches!(
                submission.submit(SubmitRequest::new(name)),
                Err(SubmitError::Validation(_))
            ));
        }
        assert!(store.list(10).unwrap().is_empty());
    }

    #[test]
    fn name_is_trimmed() {
        let (_store, _transport, submission, _status) = services();
        let job = submission
            .submit(SubmitRequest::new("  Sample Task  "))
            .unwrap();
        assert_eq!(job.name, "Sample Task");
    }

    #[test]
    fn publish_failure_marks_the_job_failed() {
        let (_store, transport, submission, status) = services();
        transport.close();

        let job = submission
            .submit(SubmitRequest::new("Doomed Task"))
            .unwrap();

        // Caller still gets an id; the record never stays Queued.
        assert_eq!(job.status, JobStatus::Failed);
        let seen = status.status(job.id).unwrap();
        assert_eq!(seen.status, JobStatus::Failed);
        match seen.result {
            Some(JobOutcome::Failure { error }) => {
                assert!(error.contains("transport error"), "got: {error}");
            }
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }

    #[test]
    fn status_of_unknown_id_is_not_found() {
        let (_store, _transport, _submission, status) = services();
        let id = JobId::new();
        assert!(matches!(
            status.status(id),
            Err(StoreError::NotFound(got)) if got == id
        ));
    }

    #[test]
    fn description_and_payload_are_stored() {
        let (_store, _transport, submission, status) = services();

        let job = submission
            .submit(SubmitRequest {
                name: "With Extras".to_string(),
                description: Some("a longer description".to_string()),
                payload: Some(serde_json::json!({"n": 3})),
            })
            .unwrap();

        let seen = status.status(job.id).unwrap();
        assert_eq!(seen.description.as_deref(), Some("a longer description"));
        assert_eq!(seen.payload, serde_json::json!({"n": 3}));
    }
}
