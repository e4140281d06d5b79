//! Access logging in Apache Combined Log Format.
//!
//! # Format
//!
//! ```text
//! 127.0.0.1 - - [10/Oct/2025:13:55:36 +0000] "GET /users/1?a=b HTTP/1.1" 200 27 "https://ref.example" "curl/8.5.0"
//! ```
//!
//! - The host is the peer address from `ConnectInfo<SocketAddr>`, or `-` when the
//!   server was not started with connect info
//! - The size is the number of body bytes handed to the layers outside the
//!   logger, counted frame by frame, so streamed bodies are logged with their
//!   real length
//! - Referer and User-Agent are written as empty quoted strings when absent
//!
//! The line is written once the response body reaches end of stream, fails, or
//! is dropped, whichever comes first. A client that disconnects mid-body is
//! logged with the bytes sent so far.
//!
//! Lines go to stdout by default. Any `tracing_subscriber` [`MakeWriter`] can be
//! plugged in instead, which the tests use to capture output.

use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::{ConnectInfo, OriginalUri};
use axum::http::{Request, Response, StatusCode, header};
use chrono::{DateTime, Local};
use http_body::{Frame, SizeHint};
use tower::{Layer, Service};
use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;

/// Placeholder for unknown fields.
const EMPTY_FIELD: &str = "-";

/// Timestamp layout used between the square brackets.
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Default writer factory: the process standard output.
pub type StdoutWriter = fn() -> io::Stdout;

/// Access log layer for Tower middleware stack.
#[derive(Clone)]
pub struct AccessLogLayer<W = StdoutWriter> {
    make_writer: W,
}

impl AccessLogLayer {
    /// Create an access log layer writing to stdout.
    pub fn new() -> Self {
        Self {
            make_writer: io::stdout,
        }
    }
}

impl Default for AccessLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> AccessLogLayer<W>
where
    W: for<'a> MakeWriter<'a>,
{
    /// Create an access log layer writing to a custom destination.
    pub fn with_writer(make_writer: W) -> Self {
        Self { make_writer }
    }
}

impl<S, W> Layer<S> for AccessLogLayer<W>
where
    W: Clone,
{
    type Service = AccessLogService<S, W>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService {
            inner,
            make_writer: self.make_writer.clone(),
        }
    }
}

/// Access log service wrapper.
#[derive(Clone)]
pub struct AccessLogService<S, W> {
    inner: S,
    make_writer: W,
}

impl<S, W> Service<Request<Body>> for AccessLogService<S, W>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + Unpin + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let entry = AccessLogEntry::from_request(&req);
        let make_writer = self.make_writer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;

            let (parts, body) = response.into_parts();
            let body = AccessLogBody {
                inner: body,
                bytes_sent: 0,
                pending: Some(PendingLine {
                    entry,
                    status: parts.status,
                    make_writer,
                }),
            };

            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}

/// Everything needed to write the line except the byte count.
struct PendingLine<W> {
    entry: AccessLogEntry,
    status: StatusCode,
    make_writer: W,
}

/// Response body wrapper counting data bytes and writing the log line when
/// the body ends or is dropped.
struct AccessLogBody<W>
where
    W: for<'a> MakeWriter<'a>,
{
    inner: Body,
    bytes_sent: u64,
    pending: Option<PendingLine<W>>,
}

impl<W> AccessLogBody<W>
where
    W: for<'a> MakeWriter<'a>,
{
    fn write_line(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let line = pending.entry.finish(pending.status, self.bytes_sent);
        let mut writer = pending.make_writer.make_writer();
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(error = %e, "Failed to write access log line");
        }
    }
}

impl<W> HttpBody for AccessLogBody<W>
where
    W: for<'a> MakeWriter<'a> + Unpin,
{
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes_sent += data.len() as u64;
                }
            }
            Poll::Ready(Some(Err(_)) | None) => this.write_line(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<W> Drop for AccessLogBody<W>
where
    W: for<'a> MakeWriter<'a>,
{
    fn drop(&mut self) {
        self.write_line();
    }
}

/// Request-side fields of a log line, captured when the request arrives.
#[derive(Debug, Clone)]
struct AccessLogEntry {
    host: String,
    received_at: DateTime<Local>,
    request_line: String,
    referer: String,
    user_agent: String,
}

impl AccessLogEntry {
    fn from_request<B>(req: &Request<B>) -> Self {
        let host = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| EMPTY_FIELD.to_string());

        // Nested routers see a stripped URI; log what the client sent
        let uri = req
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri)
            .unwrap_or_else(|| req.uri());

        let request_line = format!(
            "{} {} {:?}",
            req.method(),
            escape_quoted(&uri.to_string()),
            req.version()
        );

        Self {
            host,
            received_at: Local::now(),
            request_line,
            referer: header_text(req, header::REFERER),
            user_agent: header_text(req, header::USER_AGENT),
        }
    }

    fn finish(&self, status: StatusCode, size: u64) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {} \"{}\" \"{}\"",
            self.host,
            self.received_at.format(TIMESTAMP_FORMAT),
            self.request_line,
            status.as_u16(),
            size,
            self.referer,
            self.user_agent,
        )
    }
}

fn header_text<B>(req: &Request<B>, name: header::HeaderName) -> String {
    req.headers()
        .get(name)
        .map(|v| escape_quoted(&String::from_utf8_lossy(v.as_bytes())))
        .unwrap_or_default()
}

/// Escape a value for use inside a double-quoted log field.
fn escape_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\x{:02x}", u32::from(c));
            }
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::to_bytes;
    use axum::http::Version;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_escape_quoted() {
        assert_eq!(escape_quoted(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_quoted("a\\b"), "a\\\\b");
        assert_eq!(escape_quoted("tab\there"), "tab\\x09here");
    }

    #[test]
    fn test_entry_without_connect_info() {
        let req = Request::builder()
            .uri("/users/1?a=b")
            .version(Version::HTTP_11)
            .header(header::USER_AGENT, "curl/8.5.0")
            .body(())
            .unwrap();

        let entry = AccessLogEntry::from_request(&req);
        let line = entry.finish(StatusCode::OK, 27);

        assert!(line.starts_with("- - - ["));
        assert!(line.contains("\"GET /users/1?a=b HTTP/1.1\" 200 27 \"\" \"curl/8.5.0\""));
    }

    #[test]
    fn test_entry_with_connect_info() {
        let mut req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::REFERER, "https://ref.example")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 40000))));

        let line = AccessLogEntry::from_request(&req).finish(StatusCode::CREATED, 0);

        assert!(line.starts_with("10.0.0.7 - - ["));
        assert!(line.ends_with("\"POST /upload HTTP/1.1\" 201 0 \"https://ref.example\" \"\""));
    }

    #[tokio::test]
    async fn test_layer_writes_one_line_per_request() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let app = Router::new()
            .route("/hello", get(|| async { "hello" }))
            .layer(AccessLogLayer::with_writer(move || writer.clone()));

        let response = app
            .clone()
            .oneshot(Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(buffer.contents().is_empty());
        to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let response = app
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let output = buffer.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"GET /hello HTTP/1.1\" 200 5 "));
        assert!(lines[1].contains("\"GET /missing HTTP/1.1\" 404 "));
    }

    /// Body yielding its chunks one frame at a time with no size hint.
    struct ChunkedBody(Vec<&'static str>);

    impl HttpBody for ChunkedBody {
        type Data = Bytes;
        type Error = axum::Error;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
            if self.0.is_empty() {
                Poll::Ready(None)
            } else {
                let chunk = self.0.remove(0);
                Poll::Ready(Some(Ok(Frame::data(Bytes::from(chunk)))))
            }
        }
    }

    #[tokio::test]
    async fn test_streamed_body_logs_bytes_sent() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let app = Router::new()
            .route(
                "/stream",
                get(|| async { Body::new(ChunkedBody(vec!["abc", "def"])) }),
            )
            .layer(AccessLogLayer::with_writer(move || writer.clone()));

        let response = app
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.body().size_hint().exact(), None);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"abcdef");
        assert!(
            buffer
                .contents()
                .contains("\"GET /stream HTTP/1.1\" 200 6 \"\" \"\"")
        );
    }

    #[tokio::test]
    async fn test_dropped_body_logs_bytes_sent_so_far() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let app = Router::new()
            .route("/hello", get(|| async { "hello" }))
            .layer(AccessLogLayer::with_writer(move || writer.clone()));

        let response = app
            .oneshot(Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        drop(response);

        let output = buffer.contents();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("\"GET /hello HTTP/1.1\" 200 0 "));
    }
}
