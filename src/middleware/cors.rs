//! CORS layer built from configuration.
//!
//! # Allowed Headers
//!
//! `Content-Type` and `X-Content-Type-Options` are always allowed; `CORS_HEADERS`
//! adds to them. Header names that are not valid HTTP tokens are skipped with a
//! warning.
//!
//! # Credentials
//!
//! Browsers reject `Access-Control-Allow-Origin: *` on credentialed requests,
//! so when credentials are enabled a wildcard origin list mirrors the request
//! `Origin` instead.

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::Config;

/// Request headers allowed regardless of configuration.
pub const DEFAULT_ALLOWED_HEADERS: [HeaderName; 2] =
    [header::CONTENT_TYPE, header::X_CONTENT_TYPE_OPTIONS];

/// Methods allowed for cross-origin requests.
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::POST];

/// CORS settings captured from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct CorsSettings {
    pub enabled: bool,
    pub origins: Vec<String>,
    pub headers: Vec<String>,
    pub credentials: bool,
}

impl CorsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.cors_enabled,
            origins: config.cors_origins.clone(),
            headers: config.cors_headers.clone(),
            credentials: config.cors_credentials,
        }
    }

    /// Build the CORS layer, or `None` when CORS is disabled.
    pub fn layer(&self) -> Option<CorsLayer> {
        if !self.enabled {
            return None;
        }

        let layer = CorsLayer::new()
            .allow_methods(ALLOWED_METHODS)
            .allow_headers(self.allowed_headers())
            .allow_origin(self.allowed_origin());

        Some(if self.credentials {
            layer.allow_credentials(true)
        } else {
            layer
        })
    }

    fn allowed_headers(&self) -> Vec<HeaderName> {
        let mut headers = DEFAULT_ALLOWED_HEADERS.to_vec();
        for name in &self.headers {
            match name.parse::<HeaderName>() {
                Ok(parsed) if !headers.contains(&parsed) => headers.push(parsed),
                Ok(_) => {}
                Err(_) => warn!(header = %name, "Invalid header name in CORS_HEADERS, skipping"),
            }
        }
        headers
    }

    fn allowed_origin(&self) -> AllowOrigin {
        if self.origins.iter().any(|o| o == "*") {
            return if self.credentials {
                AllowOrigin::mirror_request()
            } else {
                AllowOrigin::any()
            };
        }

        let origins: Vec<HeaderValue> = self
            .origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Invalid origin in CORS_ORIGINS, skipping");
                    None
                }
            })
            .collect();

        AllowOrigin::list(origins)
    }
}
