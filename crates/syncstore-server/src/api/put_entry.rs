use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use syncstore_core::verify_entry;

use super::{parse_address, PutRequest, WriteResponse};
use crate::error::ApiError;
use crate::ServiceState;

/// Store one sealed entry.
///
/// The signature is checked against the public key the entry carries before
/// anything touches the store. The server never decrypts.
#[axum::debug_handler]
pub async fn handler(
    State(state): State<ServiceState>,
    Path((account, path)): Path<(String, String)>,
    Json(req): Json<PutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (account, path) = parse_address(&account, &path)?;
    let entry = req.into_entry()?;
    if entry.path != path {
        return Err(ApiError::BadRequest(format!(
            "body path {} does not match URL path {}",
            entry.path, path
        )));
    }
    verify_entry(&entry)?;

    let registry = state.registry();
    let timestamp = tokio::task::spawn_blocking(move || registry.set(&account, entry)).await??;

    tracing::debug!(%account, %path, timestamp, "Entry stored");
    Ok((
        StatusCode::OK,
        Json(WriteResponse {
            path: path.to_hex(),
            timestamp,
        }),
    ))
}
