//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use rag_gateway::config::GatewayConfig;
use rag_gateway::http::HttpServer;
use rag_gateway::lifecycle::Shutdown;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Body the mock backend answers questions with.
pub const ANSWER_BODY: &str = r#"{"model":"m","answer":"a"}"#;

/// What the mock backend saw.
#[derive(Default)]
pub struct Recorded {
    pub queries: Mutex<Vec<(HeaderMap, Bytes)>>,
    pub resets: AtomicUsize,
    pub uploads: AtomicUsize,
}

impl Recorded {
    pub fn last_query(&self) -> Option<(HeaderMap, Bytes)> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

/// One part as parsed by the mock backend's `/add_pdf`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivedPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

async fn query(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    recorded.queries.lock().unwrap().push((headers, body.clone()));

    let question = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["question"].as_str().map(str::to_owned))
        .unwrap_or_default();
    if question == "overloaded" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [("x-trace", "123"), ("content-type", "application/json")],
            r#"{"detail":"busy"}"#,
        );
    }

    (
        StatusCode::OK,
        [("x-trace", "123"), ("content-type", "application/json")],
        ANSWER_BODY,
    )
}

async fn reset(State(recorded): State<Arc<Recorded>>) -> impl IntoResponse {
    recorded.resets.fetch_add(1, Ordering::SeqCst);
    (
        [("x-trace", "123")],
        Json(serde_json::json!({"message": "RAG database reset successfully"})),
    )
}

async fn add_pdf(
    State(recorded): State<Arc<Recorded>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    recorded.uploads.fetch_add(1, Ordering::SeqCst);
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }

    let is_pdf = parts
        .iter()
        .all(|p| p.file_name.as_deref().is_some_and(|f| f.ends_with(".pdf")));
    let status = if is_pdf {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    (status, [("x-trace", "123")], Json(parts))
}

/// Start a programmable RAG backend on an ephemeral port.
pub async fn start_rag_backend() -> (SocketAddr, Arc<Recorded>) {
    let recorded = Arc::new(Recorded::default());
    let app = Router::new()
        .route("/query", post(query))
        .route("/reset", post(reset))
        .route("/add_pdf", post(add_pdf))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, recorded)
}

/// Start a backend that promises more body bytes than it sends, then hangs up.
pub async fn start_truncating_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response =
                            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nContent-Type: application/json\r\n\r\n{\"mod";
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Gateway config pointing at `backend`.
pub fn gateway_config(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backend.base_url = format!("http://{}", backend);
    config.timeouts.request_secs = 5;
    config.timeouts.upload_secs = 5;
    config
}

/// Running gateway; shuts down when dropped.
pub struct Gateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    start_gateway_with_updates(config).await.0
}

/// Start the gateway and keep the sender for pushing reloaded configs.
pub async fn start_gateway_with_updates(
    config: GatewayConfig,
) -> (Gateway, mpsc::UnboundedSender<GatewayConfig>) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    (Gateway { addr, shutdown }, updates)
}
