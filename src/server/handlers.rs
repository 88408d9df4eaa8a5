//! Route handlers.

use std::fmt::Write as _;
use std::path::{Component, Path as FsPath, PathBuf};

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::page::render_home;
use super::{ApiError, AppState};
use crate::codec::{self, WireTable};
use crate::db::{BatchOutcome, MAX_DEADLINE_SECS};
use crate::query::{QueryExecutor, StatementRunner};
use crate::worker::MemoryUsage;

/// User name shown on the home page.
pub const DEFAULT_USER: &str = "username";

/// Upper bound on the request body echoed by `/dump`.
const MAX_DUMP_BYTES: usize = 1024 * 1024;

/// `/` and every unmatched path.
pub async fn home(State(state): State<AppState>) -> Html<String> {
    MemoryUsage::current().log();
    Html(render_home(
        state.template(),
        state.version,
        state.config.debug,
        DEFAULT_USER,
    ))
}

/// `GET /ping`
pub async fn ping() -> impl IntoResponse {
    ([(ACCESS_CONTROL_ALLOW_ORIGIN, "*")], "OK")
}

/// `GET /memory`
pub async fn memory() -> impl IntoResponse {
    let usage = MemoryUsage::current();
    usage.log();
    ([(ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(usage))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    pub list: Vec<String>,
}

/// `GET /api/list`
pub async fn api_list() -> Json<ItemList> {
    Json(ItemList {
        list: vec!["AAA".to_string(), "BBB".to_string()],
    })
}

/// `/dump`: echoes the request back as plain text.
///
/// Environment variables are included only in debug mode.
pub async fn dump(State(state): State<AppState>, req: Request) -> Result<String, ApiError> {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_DUMP_BYTES)
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read body: {e}")))?;

    let mut out = String::new();
    let _ = writeln!(out, "{} {} {:?}", parts.method, parts.uri, parts.version);
    for (name, value) in &parts.headers {
        let _ = writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(&body));

    if state.config.debug {
        out.push_str("\n\n");
        let mut vars: Vec<(String, String)> = std::env::vars().collect();
        vars.sort();
        for (key, value) in vars {
            let _ = writeln!(out, "{key}={value}");
        }
    }

    Ok(out)
}

/// `/api/query`: the body is one SQL statement.
pub async fn api_query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WireTable>, ApiError> {
    let body = std::str::from_utf8(&body)
        .map_err(|e| ApiError::bad_request(format!("Query is not valid UTF-8: {e}")))?;
    info!("Query: {body}");
    let table = QueryExecutor::new(&state.store)
        .with_capacity_hint(state.config.max_lines)
        .run(body, state.config.query_timeout_secs)
        .await?;
    debug!("Query returned {} rows", table.rows().len());
    Ok(Json(codec::encode(&table)?))
}

/// Body of `POST /api/exec`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecRequest {
    pub statements: Vec<String>,
    /// Overrides the configured query timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// `POST /api/exec`: runs a batch of statements on one connection.
pub async fn api_exec(
    State(state): State<AppState>,
    request: Result<Json<ExecRequest>, JsonRejection>,
) -> Result<Json<BatchOutcome>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let timeout = request
        .timeout_secs
        .unwrap_or(state.config.query_timeout_secs);
    if !(1..=MAX_DEADLINE_SECS).contains(&timeout) {
        return Err(ApiError::bad_request(format!(
            "timeout_secs must be between 1 and {MAX_DEADLINE_SECS}"
        )));
    }

    info!("Exec: {} statements", request.statements.len());
    let outcome = StatementRunner::new(&state.store)
        .run(&request.statements, timeout)
        .await?;
    Ok(Json(outcome))
}

/// `GET /static/*path`
pub async fn static_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let file = resolve_static(&state.config.static_dir, &path)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid path: {path}")))?;

    match tokio::fs::read(&file).await {
        Ok(contents) => {
            let mime = content_type(&file);
            Ok(([(CONTENT_TYPE, mime)], Bytes::from(contents)).into_response())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found(format!("Not found: {path}")))
        }
        Err(e) => Err(ApiError::from(crate::error::RelayError::internal(format!(
            "Failed to read {}: {e}",
            file.display()
        )))),
    }
}

/// Joins `path` onto `root`, refusing anything but plain path segments.
fn resolve_static(root: &FsPath, path: &str) -> Option<PathBuf> {
    let relative = FsPath::new(path.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
