use axum::{response::IntoResponse, Json};

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the JobRelay API",
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
    }))
}
