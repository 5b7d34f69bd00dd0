use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use jobrelay_core::JobId;
use jobrelay_queue::SubmitRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const LIST_LIMIT: usize = 100;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_task).get(list_tasks))
        .route("/:id", get(get_task))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateTaskRequest>,
) -> axum::response::Response {
    let Some(name) = body.name else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "name is required");
    };

    let request = SubmitRequest {
        name,
        description: body.description,
        payload: body.payload,
    };

    match services.submission.submit(request) {
        Ok(job) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": job.id.to_string(),
                "name": job.name,
                "status": job.status.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid task id")
        }
    };

    match services.status.status(id) {
        Ok(job) => (StatusCode::OK, Json(dto::job_to_json(&job))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.status.list(LIST_LIMIT) {
        Ok(jobs) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "tasks": jobs.iter().map(dto::job_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
