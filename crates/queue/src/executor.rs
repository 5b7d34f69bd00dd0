//! Worker executor: pulls deliveries, runs handlers, records outcomes.
//!
//! Per delivery the executor walks `Received -> Executing -> Acked`. On
//! receipt it marks the record `Running` (first write wins under
//! redelivery); on handler completion it marks the terminal state and only
//! then acknowledges the delivery. Handler failures are terminal, not
//! retried; retry policy is an explicit external decision.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use jobrelay_core::JobId;

use crate::store::{JobStore, JobUpdate, StoreError};
use crate::transport::{Delivery, QueueTransport, ReceiveError, ReceivedDelivery};

/// Outcome returned by a job handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    /// Handler return value, recorded as the job result.
    Success(serde_json::Value),
    /// Error description, recorded as the job result.
    Failure(String),
}

/// Job handler function type.
pub type JobHandler = Box<dyn Fn(&Delivery) -> HandlerResult + Send + Sync>;

/// Explicit mapping from job name to handler.
///
/// Lookup is by exact name first, then the fallback handler if one is
/// registered. Jobs whose name resolves to nothing are marked `Failed`.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, JobHandler>,
    fallback: Option<JobHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact job name.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Delivery) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Register the handler used when no exact name matches.
    pub fn register_fallback<F>(&mut self, handler: F)
    where
        F: Fn(&Delivery) -> HandlerResult + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(handler));
    }

    pub fn resolve(&self, name: &str) -> Option<&JobHandler> {
        self.handlers.get(name).or(self.fallback.as_ref())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of consumer threads.
    pub workers: usize,
    /// How long a worker blocks on the transport before re-checking
    /// shutdown.
    pub poll_interval: Duration,
    /// Name used in logs and thread names.
    pub name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_millis(100),
            name: "job-worker".to_string(),
        }
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkerStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Redeliveries of already-terminal jobs, acked without re-execution.
    pub deduplicated: u64,
}

/// Handle to a running worker pool.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
    joins: Vec<thread::JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for all workers to stop.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

/// What happened to a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Handler ran and the job was marked `Succeeded`.
    Completed,
    /// Handler ran (or was missing) and the job was marked `Failed`.
    Failed,
    /// Redelivery of a terminal job; acked without executing.
    Deduplicated,
    /// Record missing from the store; acked and dropped.
    Orphaned,
}

/// Background job executor.
pub struct WorkerExecutor<S, T> {
    store: S,
    transport: T,
    registry: Arc<HandlerRegistry>,
}

impl<S, T> WorkerExecutor<S, T>
where
    S: JobStore + Clone + Send + 'static,
    T: QueueTransport,
{
    pub fn new(store: S, transport: T, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            store,
            transport,
            registry,
        }
    }

    /// Spawn `config.workers` consumer threads.
    pub fn spawn(self, config: WorkerConfig) -> WorkerHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(WorkerStats::default()));

        let joins = (0..config.workers.max(1))
            .map(|i| {
                let consumer = self.transport.consume();
                let store = self.store.clone();
                let registry = self.registry.clone();
                let shutdown = shutdown.clone();
                let stats = stats.clone();
                let config = config.clone();
                let thread_name = format!("{}-{}", config.name, i);

                thread::Builder::new()
                    .name(thread_name)
                    .spawn(move || {
                        worker_loop(store, registry, consumer, config, shutdown, stats);
                    })
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"))
            })
            .collect();

        WorkerHandle {
            shutdown,
            joins,
            stats,
        }
    }
}

fn worker_loop<S: JobStore>(
    store: S,
    registry: Arc<HandlerRegistry>,
    consumer: crate::transport::Consumer,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<WorkerStats>>,
) {
    info!(worker = %config.name, "worker started");

    while !shutdown.load(Ordering::SeqCst) {
        match consumer.recv_timeout(config.poll_interval) {
            Ok(received) => {
                let outcome = process_delivery(&store, &registry, received);
                if let Ok(mut s) = stats.lock() {
                    s.processed += 1;
                    match outcome {
                        ProcessOutcome::Completed => s.succeeded += 1,
                        ProcessOutcome::Failed => s.failed += 1,
                        ProcessOutcome::Deduplicated => s.deduplicated += 1,
                        ProcessOutcome::Orphaned => {}
                    }
                }
            }
            Err(ReceiveError::Timeout) => continue,
            Err(ReceiveError::Closed) => break,
        }
    }

    info!(worker = %config.name, "worker stopped");
}

/// Process a single delivery end to end.
///
/// Public for tests and synchronous use; the worker loop calls this for
/// every received delivery.
pub fn process_delivery<S: JobStore>(
    store: &S,
    registry: &HandlerRegistry,
    received: ReceivedDelivery,
) -> ProcessOutcome {
    let job_id = received.delivery().job_id;
    let name = received.delivery().name.clone();

    match store.update(job_id, JobUpdate::Running { at: Utc::now() }) {
        Ok(_) => {}
        Err(StoreError::InvalidTransition { .. }) => {
            // Redelivery. If the job already finished, ack and move on; if
            // it is still Running, the previous consumer disappeared
            // mid-execution and we pick the work back up.
            match store.get(job_id) {
                Ok(job) if job.status.is_terminal() => {
                    debug!(job_id = %job_id, "redelivery of terminal job, skipping");
                    received.ack();
                    return ProcessOutcome::Deduplicated;
                }
                Ok(_) => {
                    debug!(job_id = %job_id, "resuming delivery of running job");
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "store read failed");
                    // Leave unacked; the delivery will come back.
                    return ProcessOutcome::Orphaned;
                }
            }
        }
        Err(StoreError::NotFound(_)) => {
            warn!(job_id = %job_id, "delivery for unknown job, dropping");
            received.ack();
            return ProcessOutcome::Orphaned;
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "store update failed");
            return ProcessOutcome::Orphaned;
        }
    }

    debug!(job_id = %job_id, name = %name, "executing job");

    let result = match registry.resolve(&name) {
        Some(handler) => handler(received.delivery()),
        None => HandlerResult::Failure(format!("no handler registered for '{name}'")),
    };

    let outcome = match result {
        HandlerResult::Success(value) => {
            record_terminal(store, job_id, JobUpdate::Succeeded {
                value,
                at: Utc::now(),
            });
            debug!(job_id = %job_id, "job succeeded");
            ProcessOutcome::Completed
        }
        HandlerResult::Failure(error) => {
            warn!(job_id = %job_id, error = %error, "job failed");
            record_terminal(store, job_id, JobUpdate::Failed {
                error,
                at: Utc::now(),
            });
            ProcessOutcome::Failed
        }
    };

    received.ack();
    outcome
}

fn record_terminal<S: JobStore>(store: &S, job_id: JobId, update: JobUpdate) {
    match store.update(job_id, update) {
        Ok(_) => {}
        // A concurrent duplicate execution won the race; its result stands.
        Err(StoreError::InvalidTransition { .. }) => {
            debug!(job_id = %job_id, "job already finished by another worker");
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "failed to record job outcome");
        }
    }
}
