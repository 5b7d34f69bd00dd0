//! Built-in job handlers.

use std::thread;
use std::time::Duration;

use tracing::info;

use crate::executor::{HandlerRegistry, HandlerResult};
use crate::transport::Delivery;

/// Name of the scheduled-task stub handler.
pub const SCHEDULED_TASK: &str = "scheduled";

/// Build the default registry.
///
/// The `scheduled` stub is registered by exact name; every other job name
/// falls through to the sample handler, which simulates work for
/// `sample_delay` and then reports completion for the submitted name.
pub fn builtin_registry(sample_delay: Duration) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(SCHEDULED_TASK, scheduled_task);
    registry.register_fallback(move |delivery| sample_task(delivery, sample_delay));
    registry
}

/// Sample background task that simulates processing.
pub fn sample_task(delivery: &Delivery, delay: Duration) -> HandlerResult {
    info!(job_id = %delivery.job_id, name = %delivery.name, "processing task");

    // Simulate some work.
    thread::sleep(delay);

    HandlerResult::Success(serde_json::json!(format!(
        "Task '{}' completed successfully!",
        delivery.name
    )))
}

/// Scheduled-task stub.
///
/// No scheduler or recurring trigger exists; this runs only when submitted
/// explicitly.
pub fn scheduled_task(delivery: &Delivery) -> HandlerResult {
    info!(job_id = %delivery.job_id, "running scheduled task");
    HandlerResult::Success(serde_json::json!("Scheduled task completed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobrelay_core::JobId;

    fn delivery(name: &str) -> Delivery {
        Delivery {
            job_id: JobId::new(),
            name: name.to_string(),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn sample_task_reports_the_submitted_name() {
        let result = sample_task(&delivery("Sample Task"), Duration::ZERO);
        assert_eq!(
            result,
            HandlerResult::Success(serde_json::json!(
                "Task 'Sample Task' completed successfully!"
            ))
        );
    }

    #[test]
    fn scheduled_task_is_a_stub() {
        let result = scheduled_task(&delivery(SCHEDULED_TASK));
        assert_eq!(
            result,
            HandlerResult::Success(serde_json::json!("Scheduled task completed"))
        );
    }

    #[test]
    fn registry_routes_scheduled_exactly_and_everything_else_to_sample() {
        let registry = builtin_registry(Duration::ZERO);

        let scheduled = registry.resolve(SCHEDULED_TASK).unwrap();
        assert_eq!(
            scheduled(&delivery(SCHEDULED_TASK)),
            HandlerResult::Success(serde_json::json!("Scheduled task completed"))
        );

        let sample = registry.resolve("Another Task").unwrap();
        assert_eq!(
            sample(&delivery("Another Task")),
            HandlerResult::Success(serde_json::json!(
                "Task 'Another Task' completed successfully!"
            ))
        );
    }
}
