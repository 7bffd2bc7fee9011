//! Gzip compression gate for text-like response bodies.
//!
//! A response is compressed only when the client advertised `gzip` in
//! `Accept-Encoding`, the content type is textual, and the body is at
//! least [`MIN_BODY_SIZE`] bytes. Output that fails to shrink the body
//! is discarded and the response goes out untouched. The encoder
//! accumulates every produced chunk into a growable buffer, so output
//! size is never derived from a fixed scratch buffer.

use std::io::Write;

use axum::http::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

pub const MIN_BODY_SIZE: usize = 1024;

const COMPRESSIBLE_TYPES: &[&str] = &[
    "text/",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/xhtml+xml",
];

/// Whether the request/response pair passes the compression gate.
#[must_use]
pub fn should_compress(
    request_headers: &HeaderMap,
    response_headers: &HeaderMap,
    body_len: usize,
) -> bool {
    if body_len < MIN_BODY_SIZE {
        return false;
    }

    let accepts_gzip = request_headers
        .get(ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"));
    if !accepts_gzip {
        return false;
    }

    response_headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|content_type| {
            let content_type = content_type.to_ascii_lowercase();
            COMPRESSIBLE_TYPES
                .iter()
                .any(|prefix| content_type.starts_with(prefix))
        })
}

/// Gzip-encode a body.
pub fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

/// Compress the body in place when eligible and profitable. Sets
/// `Content-Encoding: gzip` on success; on any failure — including
/// output that is not smaller than the input — the response is left
/// untouched.
pub fn apply(request_headers: &HeaderMap, response_headers: &mut HeaderMap, body: &mut Bytes) {
    if !should_compress(request_headers, response_headers, body.len()) {
        return;
    }

    let compressed = match gzip(body) {
        Ok(compressed) => compressed,
        Err(e) => {
            tracing::warn!(error = %e, "gzip encoding failed, sending uncompressed");
            return;
        }
    };

    if compressed.len() >= body.len() {
        return;
    }

    tracing::debug!(
        original = body.len(),
        compressed = compressed.len(),
        "response body compressed"
    );
    *body = Bytes::from(compressed);
    response_headers.insert("content-encoding", HeaderValue::from_static("gzip"));
}
