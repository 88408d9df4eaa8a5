//! db-relay - ad-hoc SQL over HTTP against a single SQLite store.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use db_relay::cli::Cli;
use db_relay::db::Store;
use db_relay::server::{self, AppState};
use db_relay::{logging, worker};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Cli::parse_args().resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", e.kind(), e);
            std::process::exit(1);
        }
    };

    logging::init_stderr_logging(config.debug);

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: db_relay::config::Config) -> anyhow::Result<()> {
    let endpoint = config.endpoint()?;
    info!("Debug: {}", config.debug);
    info!("Port: {}", config.port);
    if let Some(endpoint) = &endpoint {
        info!("API endpoint: {}", endpoint);
    }

    let store = Store::open_with(&config.database, config.pool_size)
        .await
        .with_context(|| format!("Failed to open store {}", config.database.display()))?;
    info!("Store: {}", store.path().display());

    let port = config.port;
    let worker_interval = Duration::from_secs(config.worker_interval_secs);
    let state = AppState::new(store.clone(), config)?;
    info!("Version: {}", state.version);

    let shutdown = CancellationToken::new();
    let worker = worker::spawn(worker_interval, shutdown.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
        }
        signal.cancel();
    });

    server::serve(listener, state, shutdown.clone()).await?;

    shutdown.cancel();
    let _ = worker.await;
    store.close().await;
    Ok(())
}
