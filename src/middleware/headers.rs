//! Security response headers.
//!
//! Both headers are only added when the inner handler did not set them,
//! so a handler can still opt a specific response out (e.g. an embeddable
//! widget answering with `X-Frame-Options: SAMEORIGIN`).

use axum::http::{HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;

/// Value of `X-Frame-Options` added to every response.
pub static FRAME_OPTIONS_VALUE: HeaderValue = HeaderValue::from_static("DENY");

/// Value of `X-Content-Type-Options` added to every response.
pub static CONTENT_TYPE_OPTIONS_VALUE: HeaderValue = HeaderValue::from_static("nosniff");

/// Layer adding `X-Frame-Options: DENY`.
pub fn frame_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(header::X_FRAME_OPTIONS, FRAME_OPTIONS_VALUE.clone())
}

/// Layer adding `X-Content-Type-Options: nosniff`.
pub fn content_type_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(
        header::X_CONTENT_TYPE_OPTIONS,
        CONTENT_TYPE_OPTIONS_VALUE.clone(),
    )
}
