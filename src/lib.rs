//! # Hyperdrive
//!
//! Helpers for building HTTP APIs on Axum:
//!
//! - **Parameters**: query, form body and path parameters as one multi-valued [`ParamSet`]
//! - **Middleware**: a default chain with CORS, security headers, compression,
//!   access logging and panic recovery, configured from the environment
//! - **Method override**: opt-in `X-HTTP-Method-Override` support
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Method Override (opt-in, before routing)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CORS → Frame Options → Content-Type Options                │
//! │  → Compression → Access Log → Recovery                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (Params extractor)                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::routing::get;
//! use hyperdrive::{Api, Config, Params};
//! use tokio::net::TcpListener;
//!
//! async fn show(Params(params): Params) -> String {
//!     params.get("id").unwrap_or("none").to_string()
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let listener = TcpListener::bind(config.server_addr()).await?;
//!
//!     Api::new(config)
//!         .route("/users/{id}", get(show))
//!         .serve(listener)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Disable CORS and use the best compression:
//! ```bash
//! CORS_ENABLED=false GZIP_LEVEL=9 cargo run
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod params;
pub mod utils;

// Re-exports for convenience
pub use api::Api;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use middleware::MiddlewareChain;
pub use params::{ParamSet, Params, body_params, params, path_params, query_params};
