//! `jobrelay-queue` — job queue infrastructure.
//!
//! ## Components
//!
//! - `store`: durable job-record store, the single source of truth for
//!   status queries
//! - `transport`: at-least-once delivery channel between producers and
//!   worker consumers
//! - `executor`: worker pool that pulls deliveries, runs registered
//!   handlers, and records outcomes
//! - `handlers`: built-in handlers (`sample`, `scheduled`)
//! - `service`: submission and status services used by the HTTP layer
//!
//! Records are stored first, then published. Publishing failures are folded
//! back into the record as a terminal `Failed` outcome, so every accepted
//! submission eventually reaches a running or terminal state. Consumers see
//! at-least-once delivery and deduplicate terminal jobs by id.

pub mod executor;
pub mod handlers;
pub mod service;
pub mod store;
pub mod transport;

pub use executor::{
    HandlerRegistry, HandlerResult, ProcessOutcome, WorkerConfig, WorkerExecutor, WorkerHandle,
    WorkerStats,
};
pub use handlers::builtin_registry;
pub use service::{StatusService, SubmissionService, SubmitError, SubmitRequest};
pub use store::{InMemoryJobStore, JobStore, JobUpdate, StoreError};
pub use transport::{
    Consumer, Delivery, InMemoryTransport, QueueTransport, ReceiveError, ReceivedDelivery,
    TransportError,
};
