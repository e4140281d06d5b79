//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded once at process start from environment
//! variables (or a `.env` file) and is read-only afterwards. Middleware
//! receives it by reference at construction time; nothing in the request
//! path looks at the environment.
//!
//! # Middleware Configuration
//!
//! - `HYPERDRIVE_ENVIRONMENT`: Deployment environment; `production` hides panic stack traces
//! - `GZIP_LEVEL`: Compression level between -2 and 9 (default: -1, invalid values fall back to -1)
//! - `CORS_ENABLED`: Enable the CORS layer (default: `true`)
//! - `CORS_ORIGINS`: Comma-separated list of allowed origins (default: `*`)
//! - `CORS_HEADERS`: Comma-separated list of extra allowed request headers
//! - `CORS_CREDENTIALS`: Allow credentialed cross-origin requests (default: `false`)

use std::env;

use tracing::warn;

use crate::error::{AppError, AppResult};

/// Environment name that suppresses stack traces in recovered panics.
pub const PRODUCTION: &str = "production";

/// Lowest accepted `GZIP_LEVEL` (Huffman-only in zlib terms).
pub const MIN_GZIP_LEVEL: i32 = -2;

/// Highest accepted `GZIP_LEVEL` (best compression).
pub const MAX_GZIP_LEVEL: i32 = 9;

/// The library default compression level, also used for invalid values.
pub const DEFAULT_GZIP_LEVEL: i32 = -1;

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 5000)
    pub port: u16,

    /// Deployment environment name (default: "development")
    pub environment: String,

    // =========================================================================
    // Compression Configuration
    // =========================================================================
    /// Compression level, always within -2..=9
    pub gzip_level: i32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// When false the CORS middleware is a passthrough
    pub cors_enabled: bool,

    /// Allowed origins; "*" allows any origin
    pub cors_origins: Vec<String>,

    /// Extra allowed request headers, on top of `Content-Type` and
    /// `X-Content-Type-Options`
    pub cors_headers: Vec<String>,

    /// Allow cookies and HTTP authentication on cross-origin requests
    pub cors_credentials: bool,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if `PORT` is not a valid port number or
    /// a boolean option holds something other than a boolean. An invalid
    /// `GZIP_LEVEL` is not an error; it falls back to the default level.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 5000)?,
            environment: env::var("HYPERDRIVE_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            // Compression
            gzip_level: parse_gzip_level(env::var("GZIP_LEVEL").ok().as_deref()),

            // CORS
            cors_enabled: Self::parse_bool_env("CORS_ENABLED", true)?,
            cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
            cors_headers: parse_list(&env::var("CORS_HEADERS").unwrap_or_default()),
            cors_credentials: Self::parse_bool_env("CORS_CREDENTIALS", false)?,
        })
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if the service runs in the production environment.
    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a boolean environment variable with a default value.
    fn parse_bool_env(name: &str, default: bool) -> AppResult<bool> {
        match env::var(name) {
            Ok(val) => parse_bool(&val).ok_or_else(|| {
                AppError::ConfigError(format!("Invalid {name}: expected a boolean, got {val:?}"))
            }),
            Err(_) => Ok(default),
        }
    }
}

/// Parse the boolean spellings accepted for flags: `1`, `t`, `true` and
/// `0`, `f`, `false` in lower, upper or title case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parse `GZIP_LEVEL`, falling back to [`DEFAULT_GZIP_LEVEL`] when the value
/// is missing, non-numeric or outside -2..=9.
pub fn parse_gzip_level(value: Option<&str>) -> i32 {
    let Some(raw) = value else {
        return DEFAULT_GZIP_LEVEL;
    };

    match raw.trim().parse::<i32>() {
        Ok(level) if (MIN_GZIP_LEVEL..=MAX_GZIP_LEVEL).contains(&level) => level,
        Ok(level) => {
            warn!(
                level,
                min = MIN_GZIP_LEVEL,
                max = MAX_GZIP_LEVEL,
                "GZIP_LEVEL out of range, using default compression"
            );
            DEFAULT_GZIP_LEVEL
        }
        Err(e) => {
            warn!(value = raw, error = %e, "Invalid GZIP_LEVEL, using default compression");
            DEFAULT_GZIP_LEVEL
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: "development".to_string(),
            // Compression
            gzip_level: DEFAULT_GZIP_LEVEL,
            // CORS
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            cors_headers: vec![],
            cors_credentials: false,
        }
    }
}
