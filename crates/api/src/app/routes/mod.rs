use axum::{routing::get, Router};

pub mod system;
pub mod tasks;

/// Full routing tree.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/tasks", tasks::router())
}
