//! Default middleware chain.
//!
//! Each middleware wraps a router and returns a new one, adding a single
//! cross-cutting concern. They can be applied individually or all at once
//! through [`MiddlewareChain::default_chain`].
//!
//! # Architecture
//!
//! ```text
//! Request → CORS → Frame Options → Content-Type Options → Compression → Access Log → Recovery → Handler
//!            ↓          ↓                   ↓                  ↓             ↓           ↓
//!      preflight   X-Frame-Options   X-Content-Type-Options   gzip      stdout line   500 on panic
//! ```
//!
//! # Order
//!
//! - Recovery is innermost so it only catches faults raised by the handler
//! - The access log sits outside recovery, so recovered requests are logged with their 500
//! - Compression wraps the access log
//! - Header middleware is outermost and applies to every response, including recovered ones
//!
//! Method override is opt-in and wraps the whole router (see [`method_override`]).

pub mod access_log;
pub mod compression;
pub mod cors;
pub mod headers;
pub mod method_override;
pub mod recovery;

use axum::Router;
use tracing::{debug, info};
use tracing_subscriber::fmt::MakeWriter;

use crate::config::Config;

pub use access_log::{AccessLogLayer, AccessLogService, StdoutWriter};
pub use compression::{compression_layer, compression_level};
pub use cors::CorsSettings;
pub use headers::{content_type_options_layer, frame_options_layer};
pub use method_override::{METHOD_OVERRIDE_HEADER, MethodOverride, MethodOverrideLayer};
pub use recovery::{PanicResponder, recovery_layer};

/// Builder for the middleware chain, configured once from [`Config`].
///
/// # Example
///
/// ```rust,ignore
/// let chain = MiddlewareChain::new(&config);
/// let app = chain.default_chain(Router::new().route("/", get(index)));
/// ```
#[derive(Clone)]
pub struct MiddlewareChain<W = StdoutWriter> {
    cors: CorsSettings,
    gzip_level: i32,
    print_stack: bool,
    access_log_writer: W,
}

impl MiddlewareChain {
    /// Capture middleware settings from the configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            cors: CorsSettings::from_config(config),
            gzip_level: config.gzip_level,
            print_stack: !config.is_production(),
            access_log_writer: std::io::stdout,
        }
    }
}

impl<W> MiddlewareChain<W>
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + Unpin + 'static,
{
    /// Send access log lines somewhere other than stdout.
    pub fn with_access_log_writer<W2>(self, make_writer: W2) -> MiddlewareChain<W2>
    where
        W2: for<'a> MakeWriter<'a> + Clone + Send + Sync + Unpin + 'static,
    {
        MiddlewareChain {
            cors: self.cors,
            gzip_level: self.gzip_level,
            print_stack: self.print_stack,
            access_log_writer: make_writer,
        }
    }

    /// Wrap the router in CORS, frame options, content-type options,
    /// compression, access logging and recovery, outermost first.
    pub fn default_chain<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        info!(
            cors_enabled = self.cors.enabled,
            gzip_level = self.gzip_level,
            print_stack = self.print_stack,
            "Applying default middleware chain"
        );

        self.cors(self.frame_options(self.content_type_options(
            self.compression(self.logging(self.recovery(router))),
        )))
    }

    /// Allow cross-origin requests; a no-op when CORS is disabled.
    pub fn cors<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self.cors.layer() {
            Some(layer) => router.layer(layer),
            None => {
                debug!("CORS disabled (CORS_ENABLED=false)");
                router
            }
        }
    }

    /// Add `X-Frame-Options: DENY` to every response.
    pub fn frame_options<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(frame_options_layer())
    }

    /// Add `X-Content-Type-Options: nosniff` to every response.
    pub fn content_type_options<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(content_type_options_layer())
    }

    /// Compress responses when the client accepts gzip or deflate.
    pub fn compression<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(compression_layer(self.gzip_level))
    }

    /// Write one combined-format access log line per request.
    pub fn logging<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(AccessLogLayer::with_writer(self.access_log_writer.clone()))
    }

    /// Turn handler panics into 500 responses.
    pub fn recovery<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(recovery_layer(self.print_stack))
    }

    /// Honor `X-HTTP-Method-Override` on `POST` requests.
    ///
    /// Not part of the default chain. Wraps a whole service, since the
    /// method has to change before the router picks a route.
    pub fn method_override<T>(&self, service: T) -> MethodOverride<T> {
        tower::Layer::layer(&MethodOverrideLayer::new(), service)
    }
}
