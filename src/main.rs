//! SyncStore server
//!
//! Serves per-account entry trees over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Serve on the default address with stores under the user data dir
//! syncstore-server
//!
//! # Pick the data directory and listen address, log requests
//! syncstore-server --data-dir /var/lib/syncstore --listen 0.0.0.0:7878 -vv
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use syncstore_core::{storage::DEFAULT_MAX_DEPTH, RegistryOptions, StoreRegistry};
use syncstore_server::{ServerConfig, ServiceState};
use tokio::sync::watch;

/// SyncStore - per-account hierarchical storage with since-queries
#[derive(Parser, Debug)]
#[command(name = "syncstore-server")]
#[command(version = "0.1.0")]
#[command(about = "Per-account hierarchical store with incremental sync reads")]
struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Root directory for account stores (default: <data dir>/syncstore)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: SocketAddr,

    /// Deepest tree a recursive read or timestamp propagation will follow
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (<data dir>/syncstore)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("syncstore")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    let registry = StoreRegistry::with_options(
        &data_dir,
        RegistryOptions {
            max_depth: args.max_depth,
            ..Default::default()
        },
    );
    let state = ServiceState::new(registry);
    tracing::info!(data_dir = %data_dir.display(), "Store registry ready");

    let log_level = if args.verbose >= 2 {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let config = ServerConfig::new(args.listen).with_log_level(log_level);

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let server = tokio::spawn(syncstore_server::run(config, state.clone(), shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(());

    server.await.context("server task panicked")??;
    state.registry().close_all();
    Ok(())
}
