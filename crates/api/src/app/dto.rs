use serde::Deserialize;

use jobrelay_core::{Job, JobOutcome};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Optional at the DTO level so a missing field maps to a 400 with a
    /// useful message instead of a deserialization rejection.
    pub name: Option<String>,
    pub description: Option<String>,
    pub payload: Option<serde_json::Value>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn job_to_json(job: &Job) -> serde_json::Value {
    serde_json::json!({
        "id": job.id.to_string(),
        "name": job.name,
        "description": job.description,
        "status": job.status.to_string(),
        "result": job.result.as_ref().map(outcome_to_json),
        "created_at": job.created_at.to_rfc3339(),
        "started_at": job.started_at.map(|t| t.to_rfc3339()),
        "finished_at": job.finished_at.map(|t| t.to_rfc3339()),
    })
}

fn outcome_to_json(outcome: &JobOutcome) -> serde_json::Value {
    match outcome {
        JobOutcome::Success { value } => value.clone(),
        JobOutcome::Failure { error } => serde_json::json!(error),
    }
}
