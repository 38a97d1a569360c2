//! HTTP surface for the SyncStore account tree
//!
//! Maps "fetch subtree", "store entry" and "remove entry" onto a
//! [`StoreRegistry`](syncstore_core::StoreRegistry). The server only ever
//! sees sealed values: it checks signatures before writing but never
//! decrypts. [`StoreClient`] is the matching client, which seals values
//! before sending and opens them after reading.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

pub mod api;
pub mod client;
mod config;
mod error;
mod handlers;
mod health;
mod state;

pub use client::{ClientError, StoreClient};
pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};
pub use state::ServiceState;

const STATUS_PREFIX: &str = "/_status";

/// Largest accepted request body (16 MiB)
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the full router: `/_status` probes plus the account store API.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .nest(STATUS_PREFIX, health::router())
        .merge(api::router())
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Bind `config.listen_addr` and serve until `shutdown_rx` fires.
pub async fn run(
    config: ServerConfig,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, &config, state, shutdown_rx).await
}

/// Serve on an already bound listener until `shutdown_rx` fires.
pub async fn serve(
    listener: TcpListener,
    config: &ServerConfig,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(config.log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let app = router(state).layer(trace_layer);

    tracing::info!(addr = ?listener.local_addr()?, "Store server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    tracing::info!("Store server stopped");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
