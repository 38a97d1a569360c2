use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::{parse_address, parse_flag, WriteResponse};
use crate::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<String>,
}

/// Remove a leaf entry. Collections are refused with `409` whatever the
/// `recursive` flag says.
#[axum::debug_handler]
pub async fn handler(
    State(state): State<ServiceState>,
    Path((account, path)): Path<(String, String)>,
    Query(query): Query<RemoveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (account, path) = parse_address(&account, &path)?;
    let recursive = parse_flag("recursive", query.recursive.as_deref())?;

    let registry = state.registry();
    let timestamp =
        tokio::task::spawn_blocking(move || registry.remove(&account, &path, recursive)).await??;

    tracing::debug!(%account, %path, timestamp, "Entry removed");
    Ok((
        StatusCode::OK,
        Json(WriteResponse {
            path: path.to_hex(),
            timestamp,
        }),
    ))
}
