//! End-to-end HTTP tests against a served router on a loopback port.

use std::net::SocketAddr;

use db_relay::codec;
use db_relay::config::Config;
use db_relay::db::{Cell, Store};
use db_relay::server::{self, AppState, ErrorBody};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    _dir: TempDir,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Reply {
    status: u16,
    head: String,
    body: String,
}

async fn start() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir(&static_dir).unwrap();
    std::fs::write(static_dir.join("hello.txt"), "hi there").unwrap();

    let store = Store::open(&dir.path().join("relay.db")).await.unwrap();
    let config = Config {
        debug: false,
        query_timeout_secs: 2,
        static_dir,
        ..Config::default()
    };
    let state = AppState::new(store, config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(server::serve(listener, state, shutdown.clone()));

    TestServer {
        addr,
        shutdown,
        _dir: dir,
    }
}

async fn send(server: &TestServer, method: &str, path: &str, content_type: &str, body: &str) -> Reply {
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
        server.addr,
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();

    Reply {
        status,
        head: head.to_ascii_lowercase(),
        body: body.to_string(),
    }
}

async fn get(server: &TestServer, path: &str) -> Reply {
    send(server, "GET", path, "text/plain", "").await
}

#[tokio::test]
async fn test_ping() {
    let server = start().await;
    let reply = get(&server, "/ping").await;

    assert_eq!(reply.status, 200);
    assert!(reply.head.contains("access-control-allow-origin: *"));
    assert_eq!(reply.body, "OK");
}

#[tokio::test]
async fn test_exec_then_query() {
    let server = start().await;
    let batch = r#"{"statements":["create table tbl1 (one text, two smallint)","insert into tbl1 values ('hello!', 10), ('goodbye', 20)"]}"#;
    let reply = send(&server, "POST", "/api/exec", "application/json", batch).await;
    assert_eq!(reply.status, 200);
    let outcome: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(outcome["rows_affected"], 2);

    let reply = send(&server, "POST", "/api/query", "text/plain", "select * from tbl1").await;
    assert_eq!(reply.status, 200);
    assert!(reply.head.contains("content-type: application/json"));
    assert_eq!(
        reply.body,
        r#"{"columns":["one","two"],"data":[["hello!",10],["goodbye",20]]}"#
    );

    let table = codec::from_json(&reply.body).unwrap();
    assert_eq!(table.rows()[1][0], Cell::Text("goodbye".to_string()));
}

#[tokio::test]
async fn test_query_failure_is_structured_500() {
    let server = start().await;
    let reply = send(&server, "POST", "/api/query", "text/plain", "select * from nowhere").await;

    assert_eq!(reply.status, 500);
    let body: ErrorBody = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body.error.kind, "prepare");
    assert_eq!(body.error.position, None);
}

#[tokio::test]
async fn test_query_timeout_is_504() {
    let server = start().await;
    let reply = send(
        &server,
        "POST",
        "/api/query",
        "text/plain",
        "with recursive n(i) as (select 1 union all select i + 1 from n) select count(*) from n",
    )
    .await;

    assert_eq!(reply.status, 504);
    let body: ErrorBody = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body.error.kind, "timeout");
}

#[tokio::test]
async fn test_exec_malformed_body_is_400() {
    let server = start().await;
    let reply = send(&server, "POST", "/api/exec", "application/json", "{\"statements\":").await;

    assert_eq!(reply.status, 400);
    let body: ErrorBody = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body.error.kind, "request");
}

#[tokio::test]
async fn test_exec_failure_reports_position() {
    let server = start().await;
    let batch = r#"{"statements":["", "select 1", "not sql at all"]}"#;
    let reply = send(&server, "POST", "/api/exec", "application/json", batch).await;

    assert_eq!(reply.status, 500);
    let body: ErrorBody = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body.error.position, Some(2));
}

#[tokio::test]
async fn test_list_and_memory() {
    let server = start().await;

    let reply = get(&server, "/api/list").await;
    assert_eq!(reply.body, r#"{"list":["AAA","BBB"]}"#);

    let reply = get(&server, "/memory").await;
    assert_eq!(reply.status, 200);
    let usage: Value = serde_json::from_str(&reply.body).unwrap();
    assert!(usage.get("rss").is_some());
    assert!(usage.get("virtual").is_some());
}

#[tokio::test]
async fn test_static_and_home() {
    let server = start().await;

    let reply = get(&server, "/static/hello.txt").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "hi there");

    let reply = get(&server, "/anything/else").await;
    assert_eq!(reply.status, 200);
    assert!(reply.head.contains("content-type: text/html"));
    assert!(reply.body.contains("username"));
}
