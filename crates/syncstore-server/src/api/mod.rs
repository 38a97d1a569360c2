//! Account store routes
//!
//! ```text
//! GET    /account/{account}/store/{path}?recursive={0|1}&since={unixSeconds}
//! POST   /account/{account}/store/{path}
//! DELETE /account/{account}/store/{path}?recursive={0|1}
//! ```
//!
//! Both identifiers are 64 lowercase hex characters. Account existence and
//! authentication are checked upstream of these handlers.

use axum::routing::get;
use axum::Router;
use syncstore_core::{AccountId, PathHash};

use crate::error::ApiError;
use crate::ServiceState;

pub mod get_entry;
pub mod put_entry;
pub mod remove_entry;
pub mod wire;

pub use wire::{PutRequest, WireEntry, WriteResponse};

pub const STORE_ROUTE: &str = "/account/:account/store/:path";

pub fn router() -> Router<ServiceState> {
    Router::new().route(
        STORE_ROUTE,
        get(get_entry::handler)
            .post(put_entry::handler)
            .delete(remove_entry::handler),
    )
}

/// URL path of one entry, relative to the server root
pub fn store_path(account: &AccountId, path: &PathHash) -> String {
    format!("/account/{}/store/{}", account, path)
}

fn parse_address(account: &str, path: &str) -> Result<(AccountId, PathHash), ApiError> {
    Ok((AccountId::from_hex(account)?, PathHash::from_hex(path)?))
}

/// Accepts `0`/`1` and `false`/`true`; absent means false.
fn parse_flag(name: &str, value: Option<&str>) -> Result<bool, ApiError> {
    match value {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(ApiError::BadRequest(format!(
            "{} must be 0 or 1, got {:?}",
            name, other
        ))),
    }
}

/// Unix seconds. Absent, empty or non-positive values disable pruning.
fn parse_since(value: Option<&str>) -> Result<Option<i64>, ApiError> {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let since: i64 = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("since must be unix seconds, got {:?}", raw)))?;
    Ok(Some(since).filter(|&s| s > 0))
}
