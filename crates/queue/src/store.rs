//! Job record storage.
//!
//! The store is the authoritative copy of every job record. All operations
//! are atomic with respect to a single id; updates to different ids never
//! block each other (membership map under a read lock, one mutex per
//! record).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use jobrelay_core::{DomainError, Job, JobId};

/// A status update applied to an existing record.
///
/// Carries the target status, the outcome where the status is terminal, and
/// the timestamp bounding the transition.
#[derive(Debug, Clone)]
pub enum JobUpdate {
    Running {
        at: DateTime<Utc>,
    },
    Succeeded {
        value: serde_json::Value,
        at: DateTime<Utc>,
    },
    Failed {
        error: String,
        at: DateTime<Utc>,
    },
}

/// Job store abstraction.
pub trait JobStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateId` if the id exists.
    fn put(&self, job: Job) -> Result<(), StoreError>;

    /// Apply a status update. Fails with `NotFound` for unknown ids and
    /// `InvalidTransition` for updates that would violate the monotonic
    /// lifecycle. Returns the updated record.
    fn update(&self, id: JobId, update: JobUpdate) -> Result<Job, StoreError>;

    /// Fetch the current record. Fails with `NotFound` for unknown ids.
    fn get(&self, id: JobId) -> Result<Job, StoreError>;

    /// List known records, newest first.
    fn list(&self, limit: usize) -> Result<Vec<Job>, StoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn put(&self, job: Job) -> Result<(), StoreError> {
        (**self).put(job)
    }

    fn update(&self, id: JobId, update: JobUpdate) -> Result<Job, StoreError> {
        (**self).update(id, update)
    }

    fn get(&self, id: JobId) -> Result<Job, StoreError> {
        (**self).get(id)
    }

    fn list(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        (**self).list(limit)
    }
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    DuplicateId(JobId),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("invalid transition for job {id}: {source}")]
    InvalidTransition {
        id: JobId,
        source: DomainError,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn record(&self, id: JobId) -> Result<Arc<Mutex<Job>>, StoreError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| StoreError::Storage("job map lock poisoned".to_string()))?;
        jobs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }
}

impl JobStore for InMemoryJobStore {
    fn put(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| StoreError::Storage("job map lock poisoned".to_string()))?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateId(job.id));
        }
        jobs.insert(job.id, Arc::new(Mutex::new(job)));
        Ok(())
    }

    fn update(&self, id: JobId, update: JobUpdate) -> Result<Job, StoreError> {
        let record = self.record(id)?;
        let mut job = record
            .lock()
            .map_err(|_| StoreError::Storage(format!("record lock poisoned: {id}")))?;

        let applied = match update {
            JobUpdate::Running { at } => job.mark_running(at),
            JobUpdate::Succeeded { value, at } => job.mark_succeeded(value, at),
            JobUpdate::Failed { error, at } => job.mark_failed(error, at),
        };

        applied.map_err(|source| StoreError::InvalidTransition { id, source })?;
        Ok(job.clone())
    }

    fn get(&self, id: JobId) -> Result<Job, StoreError> {
        let record = self.record(id)?;
        let job = record
            .lock()
            .map_err(|_| StoreError::Storage(format!("record lock poisoned: {id}")))?;
        Ok(job.clone())
    }

    fn list(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| StoreError::Storage("job map lock poisoned".to_string()))?;

        let mut result = Vec::with_capacity(jobs.len().min(limit));
        for record in jobs.values() {
            let job = record
                .lock()
                .map_err(|_| StoreError::Storage("record lock poisoned".to_string()))?;
            result.push(job.clone());
        }

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);
        Ok(result)
    }
}
