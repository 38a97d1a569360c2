use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ErrorBody;

pub async fn not_found_handler() -> Response {
    let body = ErrorBody {
        error: "not_found".to_string(),
        message: "no such route".to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
