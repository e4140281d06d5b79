//! End-to-end test against a served `Api` on an ephemeral port.
//!
//! Run with: `cargo test --test server`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use axum::Json;
use axum::routing::get;
use hyperdrive::{Api, Config, ParamSet, Params};
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

async fn echo(Params(params): Params) -> Json<ParamSet> {
    Json(params)
}

/// Test fixture owning a running server and its shutdown trigger.
struct TestServer {
    base_url: String,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(config: Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to ephemeral port");
        let addr = listener.local_addr().expect("Failed to get local address");

        let (tx, rx) = oneshot::channel::<()>();
        let api = Api::new(config)
            .route(
                "/params/{id}",
                get(echo).post(echo).put(echo).delete(echo),
            )
            .route("/delete-only/{id}", axum::routing::delete(echo))
            .with_method_override();

        let handle = tokio::spawn(api.serve_with_shutdown(listener, async move {
            let _ = rx.await;
        }));

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle
            .await
            .expect("Server task panicked")
            .expect("Server returned an error");
    }
}

#[tokio::test]
async fn test_served_params_with_default_chain() {
    let server = TestServer::start(Config::default()).await;

    let response = server
        .client
        .get(server.url("/params/7?a=b&a=c"))
        .header("Origin", "https://app.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"id": ["7"], "a": ["b", "c"]}));

    server.stop().await;
}

#[tokio::test]
async fn test_served_form_post() {
    let server = TestServer::start(Config::default()).await;

    let response = server
        .client
        .post(server.url("/params/9?source=query"))
        .form(&[("source", "form"), ("name", "widget")])
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"id": ["9"], "source": ["query", "form"], "name": ["widget"]})
    );

    server.stop().await;
}

#[tokio::test]
async fn test_served_method_override() {
    let server = TestServer::start(Config::default()).await;

    let response = server
        .client
        .post(server.url("/delete-only/3"))
        .header("X-HTTP-Method-Override", "DELETE")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .post(server.url("/delete-only/3"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);

    server.stop().await;
}

#[tokio::test]
async fn test_served_cors_disabled() {
    let config = Config {
        cors_enabled: false,
        ..Config::default()
    };
    let server = TestServer::start(config).await;

    let response = server
        .client
        .get(server.url("/params/1"))
        .header("Origin", "https://app.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("access-control-allow-origin").is_none());

    server.stop().await;
}
