use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::ServiceState;

pub fn router() -> Router<ServiceState> {
    Router::new().route("/healthz", get(healthz_handler))
}

#[tracing::instrument]
pub async fn healthz_handler() -> Response {
    let msg = serde_json::json!({"status": "ok"});
    (StatusCode::OK, Json(msg)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = healthz_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
