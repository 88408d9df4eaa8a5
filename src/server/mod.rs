//! HTTP surface of the relay.
//!
//! Thin axum plumbing around the engine: handlers take the SQL out of the
//! request, hand it to the executor or batch runner together with the
//! configured deadline, and render the result or the classified failure.

pub mod handlers;
mod page;
mod response;

pub use page::{render_home, DEFAULT_TEMPLATE};
pub use response::{ApiError, ErrorBody, ErrorDetail};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Request};
use axum::http::header::HOST;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::error::{RelayError, Result};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
    /// Start-up time as a unix timestamp, shown on the home page.
    pub version: i64,
    template: Arc<str>,
}

impl AppState {
    /// Builds the state, loading the home page template from the config.
    pub fn new(store: Store, config: Config) -> Result<Self> {
        let template: Arc<str> = match &config.template {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|e| {
                    RelayError::config(format!(
                        "Failed to read template {}: {e}",
                        path.display()
                    ))
                })?
                .into(),
            None => DEFAULT_TEMPLATE.into(),
        };

        let version = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        Ok(Self {
            store,
            config: Arc::new(config),
            version,
            template,
        })
    }

    /// The home page template source.
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/memory", get(handlers::memory))
        .route("/dump", any(handlers::dump))
        .route("/api/list", get(handlers::api_list))
        .route("/api/query", any(handlers::api_query))
        .route("/api/exec", post(handlers::api_exec))
        .route("/static/*path", get(handlers::static_file))
        .fallback(handlers::home)
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Logs one line per request: method, host, URI and remote address.
async fn trace_request(req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let host = req
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    info!(">>> {} {}{} ({})", req.method(), host, req.uri(), remote);
    next.run(req).await
}
