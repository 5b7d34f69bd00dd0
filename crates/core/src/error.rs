//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic domain failures (bad identifiers,
/// lifecycle violations). Infrastructure concerns belong to the
/// store/transport error types; input validation lives at the submission
/// boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A status transition would violate the monotonic job lifecycle.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: crate::job::JobStatus,
        to: crate::job::JobStatus,
    },
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
