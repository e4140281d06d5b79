//! API value tying configuration, routes and middleware together.
//!
//! ```rust,ignore
//! let api = Api::new(Config::from_env()?)
//!     .route("/users/{id}", get(show_user))
//!     .with_method_override();
//!
//! let listener = TcpListener::bind(api.config().server_addr()).await?;
//! api.serve(listener).await?;
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;

use axum::extract::Request;
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::{Router, ServiceExt};
use tokio::net::TcpListener;
use tower::util::BoxCloneSyncService;
use tracing::info;

use crate::config::Config;
use crate::middleware::MiddlewareChain;
use crate::utils;

/// Routes plus the configuration the middleware chain is built from.
#[derive(Clone)]
pub struct Api {
    config: Config,
    router: Router,
    method_override: bool,
}

impl Api {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            router: Router::new(),
            method_override: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a route; path variables use `{name}` syntax.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Merge the routes of another router.
    pub fn merge(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Honor `X-HTTP-Method-Override` when serving.
    ///
    /// Only [`Api::into_service`] and the `serve` methods apply the override.
    /// [`Api::into_router`] returns a `Router`, which routes before any
    /// wrapping layer could change the method, so it ignores this flag.
    pub fn with_method_override(mut self) -> Self {
        self.method_override = true;
        self
    }

    /// The routes wrapped in the default middleware chain, without method
    /// override. Use [`Api::into_service`] to get everything that is served.
    pub fn into_router(self) -> Router {
        MiddlewareChain::new(&self.config).default_chain(self.router)
    }

    /// The service [`Api::serve`] runs: the default chain, wrapped in method
    /// override when [`Api::with_method_override`] was called.
    pub fn into_service(self) -> BoxCloneSyncService<Request, Response, Infallible> {
        let chain = MiddlewareChain::new(&self.config);
        let router = chain.default_chain(self.router);

        if self.method_override {
            BoxCloneSyncService::new(chain.method_override(router))
        } else {
            BoxCloneSyncService::new(router)
        }
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        self.serve_with_shutdown(listener, utils::shutdown_signal())
            .await
    }

    /// Serve until `signal` completes, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, method_override = self.method_override, "Serving API");
        }

        let service = self.into_service();
        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(service),
        )
        .with_graceful_shutdown(signal)
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::{delete, get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_into_router_applies_default_chain() {
        let router = Api::new(Config::default())
            .route("/ok", get(|| async { "ok" }))
            .into_router();

        let response = router
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_routes() {
        let extra = Router::new().route("/extra", get(|| async { "extra" }));
        let router = Api::new(Config::default())
            .route("/ok", get(|| async { "ok" }))
            .merge(extra)
            .into_router();

        let response = router
            .oneshot(Request::get("/extra").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    fn override_request() -> Request {
        Request::post("/items/1")
            .header("X-HTTP-Method-Override", "DELETE")
            .body(Body::empty())
            .unwrap()
    }

    fn delete_only_api() -> Api {
        Api::new(Config::default())
            .route("/items/{id}", delete(|| async { "deleted" }))
            .with_method_override()
    }

    #[tokio::test]
    async fn test_into_service_applies_method_override() {
        let response = delete_only_api()
            .into_service()
            .oneshot(override_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );
    }

    #[tokio::test]
    async fn test_into_router_ignores_method_override() {
        let response = delete_only_api()
            .into_router()
            .oneshot(override_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_method_override_flag() {
        let api = Api::new(Config::default());
        assert!(!api.method_override);
        assert!(api.with_method_override().method_override);
    }
}
