//! `jobrelay-core` — domain foundation for the job queue.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! job identifiers, the job record, its status lifecycle, and the domain
//! error model.

pub mod error;
pub mod id;
pub mod job;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{Job, JobOutcome, JobStatus};
