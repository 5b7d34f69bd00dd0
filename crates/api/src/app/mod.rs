//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: store/transport/worker wiring behind `AppServices`
//! - `routes/`: HTTP routes and handlers
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};

use jobrelay_queue::WorkerHandle;

use crate::config::ApiConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router plus the worker pool serving it.
///
/// The returned [`WorkerHandle`] owns the worker threads; keep it alive for
/// the lifetime of the server and call `shutdown()` to stop them.
pub fn build_app(config: &ApiConfig) -> (Router, WorkerHandle) {
    let (services, workers) = services::build_services(config);
    let app = routes::router().layer(Extension(Arc::new(services)));
    (app, workers)
}
