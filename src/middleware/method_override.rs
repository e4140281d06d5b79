//! HTTP method override for clients limited to `GET` and `POST`.
//!
//! A `POST` request carrying `X-HTTP-Method-Override: PUT`, `PATCH` or
//! `DELETE` is dispatched as that method. Both the header name lookup and
//! the value comparison are exact: `delete` is ignored. A `_method` form
//! field is not consulted; only the header triggers an override.
//!
//! # Placement
//!
//! The override must happen before routing, so this layer wraps the whole
//! router instead of being added with `Router::layer`:
//!
//! ```rust,ignore
//! let app = MethodOverrideLayer::new().layer(router);
//! axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
//! ```

use std::task::{Context, Poll};

use axum::http::{Method, Request};
use tower::{Layer, Service};
use tracing::debug;

/// Header carrying the overriding method.
pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";

/// Method override layer for Tower middleware stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodOverrideLayer;

impl MethodOverrideLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for MethodOverrideLayer {
    type Service = MethodOverride<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MethodOverride { inner }
    }
}

/// Method override service wrapper.
#[derive(Clone, Debug)]
pub struct MethodOverride<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for MethodOverride<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        if let Some(method) = overridden_method(&req) {
            debug!(from = %req.method(), to = %method, "Overriding request method");
            *req.method_mut() = method;
        }
        self.inner.call(req)
    }
}

/// The method a `POST` request asks to be treated as, if any.
fn overridden_method<B>(req: &Request<B>) -> Option<Method> {
    if req.method() != Method::POST {
        return None;
    }

    match req.headers().get(METHOD_OVERRIDE_HEADER)?.as_bytes() {
        b"PUT" => Some(Method::PUT),
        b"PATCH" => Some(Method::PATCH),
        b"DELETE" => Some(Method::DELETE),
        _ => None,
    }
}
