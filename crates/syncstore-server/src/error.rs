use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use syncstore_core::{ErrorKind, StoreError};

/// JSON body of every failed API call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Snake_case error kind, see [`ErrorKind::as_str`]
    pub error: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Store(e) => e.kind(),
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
            ApiError::Task(_) => ErrorKind::StorageUnavailable,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::PathNotFound => StatusCode::NOT_FOUND,
            ErrorKind::ParentNotFound => StatusCode::PRECONDITION_FAILED,
            ErrorKind::CannotRemoveCollection => StatusCode::CONFLICT,
            ErrorKind::CryptoFailure => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Corrupted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to hand to a remote caller. Storage and crypto internals
    /// stay in the server log.
    fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::StorageUnavailable => "storage unavailable".to_string(),
            ErrorKind::Corrupted => "stored tree is inconsistent".to_string(),
            ErrorKind::CryptoFailure => "entry signature did not verify".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind.is_routine() {
            tracing::debug!(error = %self, kind = %kind, "Request rejected");
        } else {
            tracing::error!(error = %self, kind = %kind, "Request failed");
        }

        let body = ErrorBody {
            error: kind.as_str().to_string(),
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
