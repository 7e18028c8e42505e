//! Integration tests for the JSON-lines server.
//!
//! Starts an in-process service on a random port and talks to it over TCP.

#![cfg(feature = "server")]

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use common::GraphSource;
use huginn::server::HuginnService;
use huginn::server::config::LimitsConfig;
use huginn::{Huginn, Mediator, Result};

fn wiki() -> GraphSource {
    GraphSource::new()
        .page("Rust", "a language")
        .search_result("metal", &["Iron", "Steel", "Copper"])
        .link("Rust", &["Oxide", "Iron"])
        .link("Oxide", &["Iron"])
}

/// Start a test server on a random port.
async fn start_test_server(
    source: GraphSource,
    limits: LimitsConfig,
) -> (SocketAddr, Arc<Mediator>, JoinHandle<Result<()>>) {
    let mediator = Arc::new(
        Huginn::builder()
            .content_source(Arc::new(source))
            .build()
            .expect("failed to build test mediator"),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = HuginnService::new(Arc::clone(&mediator)).limits(limits);
    let handle = tokio::spawn(async move { service.serve(listener).await });
    (addr, mediator, handle)
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send_raw(&mut self, line: &str) -> Value {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        let reply = self.lines.next_line().await.unwrap().expect("connection closed");
        serde_json::from_str(&reply).unwrap()
    }

    async fn send(&mut self, request: Value) -> Value {
        self.send_raw(&request.to_string()).await
    }
}

#[tokio::test]
async fn answers_every_operation() {
    let (addr, _, _) = start_test_server(wiki(), LimitsConfig::default()).await;
    let mut client = Client::connect(addr).await;

    let reply = client
        .send(json!({"id": "1", "type": "search", "query": "metal", "limit": 2}))
        .await;
    assert_eq!(reply, json!({"id": "1", "status": "success", "response": ["Iron", "Steel"]}));

    let reply = client
        .send(json!({"id": 2, "type": "getPage", "pageTitle": "Rust"}))
        .await;
    assert_eq!(reply["status"], "success");
    assert_eq!(reply["response"], "a language");

    let reply = client.send(json!({"id": 3, "type": "zeitgeist", "limit": 5})).await;
    assert_eq!(reply["response"], json!(["metal", "Rust"]));

    let reply = client
        .send(json!({"id": 4, "type": "trending", "timeLimitInSeconds": 60, "maxItems": 1}))
        .await;
    assert_eq!(reply["response"], json!(["metal"]));

    let reply = client
        .send(json!({"id": 5, "type": "shortestPath", "pageTitle1": "Oxide", "pageTitle2": "Iron", "timeout": 5}))
        .await;
    assert_eq!(reply["response"], json!(["Oxide", "Iron"]));

    let reply = client.send(json!({"id": 6, "type": "windowedPeakLoad"})).await;
    assert_eq!(reply["response"], json!(6));

    let reply = client
        .send(json!({"id": 7, "type": "windowedPeakLoad", "timeWindowInSeconds": 1}))
        .await;
    assert_eq!(reply["status"], "success");
}

#[tokio::test]
async fn failures_are_reported_per_request() {
    let (addr, _, _) = start_test_server(wiki(), LimitsConfig::default()).await;
    let mut client = Client::connect(addr).await;

    let reply = client
        .send(json!({"id": "neg", "type": "zeitgeist", "limit": -1}))
        .await;
    assert_eq!(reply["id"], "neg");
    assert_eq!(reply["status"], "failed");
    assert!(reply["response"].as_str().unwrap().contains("limit"));

    let reply = client
        .send(json!({"id": "missing", "type": "getPage", "pageTitle": "Atlantis"}))
        .await;
    assert_eq!(reply["status"], "failed");
    assert!(reply["response"].as_str().unwrap().contains("Atlantis"));

    let reply = client.send(json!({"id": "odd", "type": "dance"})).await;
    assert_eq!(reply["id"], "odd");
    assert_eq!(reply["status"], "failed");

    let reply = client.send_raw("{not json").await;
    assert_eq!(reply["id"], Value::Null);
    assert_eq!(reply["status"], "failed");

    // The connection keeps working after failures.
    let reply = client.send(json!({"id": "ok", "type": "zeitgeist", "limit": 1})).await;
    assert_eq!(reply["status"], "success");
}

#[tokio::test]
async fn slow_requests_time_out() {
    let source = wiki().latency(Duration::from_secs(3));
    let (addr, _, _) = start_test_server(source, LimitsConfig::default()).await;
    let mut client = Client::connect(addr).await;

    let reply = client
        .send(json!({"id": 1, "type": "getPage", "pageTitle": "Rust", "timeout": 1}))
        .await;
    assert_eq!(
        reply,
        json!({"id": 1, "status": "failed", "response": "Operation timed out."})
    );

    let reply = client
        .send(json!({"id": 2, "type": "shortestPath", "pageTitle1": "Rust", "pageTitle2": "Iron", "timeout": 1}))
        .await;
    assert_eq!(reply["response"], "Operation timed out.");
}

#[tokio::test]
async fn default_timeout_applies_without_one_in_request() {
    let source = wiki().latency(Duration::from_secs(3));
    let limits = LimitsConfig {
        request_timeout_secs: 1,
        ..LimitsConfig::default()
    };
    let (addr, _, _) = start_test_server(source, limits).await;
    let mut client = Client::connect(addr).await;

    let reply = client
        .send(json!({"id": 1, "type": "search", "query": "metal", "limit": 1}))
        .await;
    assert_eq!(reply["response"], "Operation timed out.");
}

#[tokio::test]
async fn clients_are_served_concurrently() {
    let (addr, _, _) = start_test_server(wiki(), LimitsConfig::default()).await;
    let mut first = Client::connect(addr).await;
    let mut second = Client::connect(addr).await;

    let a = first.send(json!({"id": "a", "type": "zeitgeist", "limit": 1}));
    let b = second.send(json!({"id": "b", "type": "zeitgeist", "limit": 1}));
    let (a, b) = tokio::join!(a, b);
    assert_eq!(a["id"], "a");
    assert_eq!(b["id"], "b");
}

#[tokio::test]
async fn stop_says_bye_and_ends_serving() {
    let (addr, mediator, handle) = start_test_server(wiki(), LimitsConfig::default()).await;
    let mut client = Client::connect(addr).await;

    client.send(json!({"id": 1, "type": "zeitgeist", "limit": 1})).await;
    let reply = client.send(json!({"id": 2, "type": "stop"})).await;
    assert_eq!(reply, json!({"id": 2, "status": "success", "response": "bye"}));

    let served = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(served.is_ok());
    assert_eq!(client.lines.next_line().await.unwrap(), None);
    // Stop is not a mediator operation.
    assert_eq!(mediator.ledger().len(), 1);
}
