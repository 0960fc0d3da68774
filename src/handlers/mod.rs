pub mod functions;
pub mod health;

use axum::{http::StatusCode, response::IntoResponse};

use crate::error::json_error;

/// Fallback for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}
