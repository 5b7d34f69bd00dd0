use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use jobrelay_queue::{StoreError, SubmitError};

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("unknown task: {id}"))
        }
        // Impossible under correct usage of the submission/status services;
        // if one shows up here it is a bug, not a caller error.
        StoreError::DuplicateId(_) | StoreError::InvalidTransition { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            err.to_string(),
        ),
        StoreError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        SubmitError::Store(e) => store_error_to_response(e),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
