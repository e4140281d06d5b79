use std::net::SocketAddr;
use std::process::ExitCode;

use axum::Json;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hyperdrive::{Api, AppError, AppResult, Config, ParamSet, Params};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Hyperdrive demo v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        environment = %config.environment,
        "Configuration loaded"
    );

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    let api = Api::new(config)
        .route("/health", get(health))
        .route("/params", get(echo_params).post(echo_params))
        .route(
            "/params/{id}",
            get(echo_params)
                .post(echo_params)
                .put(echo_params)
                .patch(echo_params)
                .delete(echo_params),
        )
        .route("/users/{id}", get(show_user))
        .route("/panic", get(panic_handler))
        .with_method_override();

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health             - Health check");
    info!("  ANY  /params[/{{id}}]      - Echo merged query, form and path parameters");
    info!("  GET  /users/{{id}}         - Numeric id validation example");
    info!("  GET  /panic              - Exercise panic recovery");

    api.serve(listener).await.map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn echo_params(Params(params): Params) -> Json<ParamSet> {
    Json(params)
}

/// Parameters are best effort; handlers validate what they need.
async fn show_user(Params(params): Params) -> AppResult<Json<Value>> {
    let id: u64 = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| AppError::BadRequest("id must be a positive integer".to_string()))?;

    Ok(Json(json!({ "id": id, "params": params })))
}

async fn panic_handler() -> &'static str {
    panic!("demo panic from /panic")
}
