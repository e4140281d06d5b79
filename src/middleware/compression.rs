//! Response compression negotiated through `Accept-Encoding`.
//!
//! # Levels
//!
//! Levels follow zlib numbering, as configured through `GZIP_LEVEL`:
//!
//! | Level | Meaning |
//! |-------|---------|
//! | `-2` | Huffman-only in zlib; mapped to the fastest level |
//! | `-1` | Library default |
//! | `0` | No compression, DEFLATE framing only |
//! | `1..=9` | Best speed to best compression |
//!
//! Out-of-range values never reach this module; `Config` replaces them with `-1`.

use tower_http::CompressionLevel;
use tower_http::compression::CompressionLayer;

use crate::config::{MAX_GZIP_LEVEL, MIN_GZIP_LEVEL};

/// Translate a zlib-style level into a [`CompressionLevel`].
pub fn compression_level(level: i32) -> CompressionLevel {
    match level {
        MIN_GZIP_LEVEL => CompressionLevel::Fastest,
        0..=MAX_GZIP_LEVEL => CompressionLevel::Precise(level),
        _ => CompressionLevel::Default,
    }
}

/// Gzip and deflate compression at the given level.
pub fn compression_layer(level: i32) -> CompressionLayer {
    CompressionLayer::new()
        .gzip(true)
        .deflate(true)
        .quality(compression_level(level))
}
