//! Panic recovery for request handlers.
//!
//! A panic inside the wrapped handler is caught per request and turned into a
//! `500 Internal Server Error` JSON response. The panic message is always
//! logged; the stack trace of the panicking thread is logged only outside the
//! `production` environment.
//!
//! # Stack Traces
//!
//! By the time the panic reaches the recovery layer the stack has unwound, so
//! the trace is captured by a panic hook installed once per process and handed
//! over through a thread-local slot. The hook chains to the previously
//! installed one.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::panic;
use std::sync::Once;

use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tracing::error;

use crate::error::AppError;

thread_local! {
    static PANIC_BACKTRACE: Cell<Option<Backtrace>> = const { Cell::new(None) };
}

static BACKTRACE_HOOK: Once = Once::new();

/// Install the panic hook recording backtraces, at most once.
fn install_backtrace_hook() {
    BACKTRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            PANIC_BACKTRACE.with(|slot| slot.set(Some(Backtrace::force_capture())));
            previous(info);
        }));
    });
}

/// Builds the response for a recovered panic.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder {
    print_stack: bool,
}

impl PanicResponder {
    pub fn new(print_stack: bool) -> Self {
        if print_stack {
            install_backtrace_hook();
        }
        Self { print_stack }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = panic_message(err.as_ref());

        // Always drain the slot so a stale trace never leaks into a later panic
        let backtrace = PANIC_BACKTRACE.with(Cell::take);

        if self.print_stack
            && let Some(backtrace) = backtrace
        {
            error!(panic = %message, backtrace = %backtrace, "Recovered panic stack trace");
        }

        AppError::Internal(format!("handler panicked: {message}")).into_response()
    }
}

/// Recovery layer; `print_stack` enables stack trace logging.
pub fn recovery_layer(print_stack: bool) -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder::new(print_stack))
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
