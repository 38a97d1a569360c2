use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::{parse_address, parse_flag, parse_since, WireEntry};
use crate::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<String>,
    /// Unix seconds; `0` or absent disables pruning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

#[axum::debug_handler]
pub async fn handler(
    State(state): State<ServiceState>,
    Path((account, path)): Path<(String, String)>,
    Query(query): Query<GetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (account, path) = parse_address(&account, &path)?;
    let recursive = parse_flag("recursive", query.recursive.as_deref())?;
    let since = parse_since(query.since.as_deref())?;

    let registry = state.registry();
    let entry = tokio::task::spawn_blocking(move || registry.get(&account, &path, recursive, since))
        .await??;

    tracing::debug!(%account, %path, recursive, ?since, "Entry read");
    Ok((StatusCode::OK, Json(WireEntry::from(&entry))))
}
