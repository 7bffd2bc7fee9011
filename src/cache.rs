//! Read-through / write-behind response caching.
//!
//! Entries are keyed by the request fingerprint `cache:<method>:<uri>`
//! and hold the wire-serialized response: status line, headers, CRLF
//! separator, raw body bytes. The store treats them as opaque blobs;
//! [`ResponseCache::read`] re-parses on the way out, preserving the
//! stored status code, and stamps `X-Proxy-Cache: HIT`. Malformed
//! blobs and store failures degrade to a miss — the cache can slow a
//! request down but never fail one.

use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL};
use axum::http::{Method, StatusCode};
use bytes::Bytes;

use crate::store::KvStore;

pub const CACHE_HEADER: &str = "x-proxy-cache";

#[derive(Debug)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct ResponseCache {
    store: Arc<dyn KvStore>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn fingerprint(method: &Method, uri: &str) -> String {
        format!("cache:{method}:{uri}")
    }

    /// Look up a cached response. Only GET requests are served from
    /// cache; anything unreadable is a miss.
    pub async fn read(&self, method: &Method, uri: &str) -> Option<CachedResponse> {
        if method != Method::GET {
            return None;
        }

        let key = Self::fingerprint(method, uri);
        let blob = match self.store.get(&key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let Some(mut cached) = parse_response(&blob) else {
            tracing::warn!(key = %key, "malformed cache entry, treating as miss");
            return None;
        };

        cached
            .headers
            .insert(CACHE_HEADER, HeaderValue::from_static("HIT"));
        Some(cached)
    }

    /// Store a response when it is eligible. The route-level
    /// `cache_enabled` gate belongs to the caller; the method, status,
    /// and `Cache-Control` gates are enforced here.
    pub async fn write(
        &self,
        method: &Method,
        uri: &str,
        status: StatusCode,
        headers: &HeaderMap,
        body: &Bytes,
        ttl_seconds: u64,
    ) {
        if !is_cacheable(method, status, headers) {
            return;
        }

        let key = Self::fingerprint(method, uri);
        let blob = serialize_response(status, headers, body);

        if let Err(e) = self.store.set_ex(&key, &blob, ttl_seconds).await {
            tracing::warn!(key = %key, error = %e, "cache write failed, continuing");
        } else {
            tracing::debug!(key = %key, ttl_seconds, "response cached");
        }
    }
}

/// Response-side cacheability: GET, 200, and a `Cache-Control` free of
/// `no-store`, `no-cache`, and `private`.
#[must_use]
pub fn is_cacheable(method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
    if method != Method::GET || status != StatusCode::OK {
        return false;
    }

    match headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok()) {
        None => true,
        Some(value) => {
            let value = value.to_ascii_lowercase();
            !value.contains("no-store") && !value.contains("no-cache") && !value.contains("private")
        }
    }
}

/// Wire-serialize a response: `HTTP/1.1 <code> <reason>`, one header
/// per line, blank line, body bytes.
#[must_use]
pub fn serialize_response(status: StatusCode, headers: &HeaderMap, body: &Bytes) -> Vec<u8> {
    let reason = status.canonical_reason().unwrap_or("");
    let mut blob = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason).into_bytes();

    for (name, value) in headers {
        blob.extend_from_slice(name.as_str().as_bytes());
        blob.extend_from_slice(b": ");
        blob.extend_from_slice(value.as_bytes());
        blob.extend_from_slice(b"\r\n");
    }

    blob.extend_from_slice(b"\r\n");
    blob.extend_from_slice(body);
    blob
}

/// Re-parse a serialized response. Returns `None` for anything that
/// does not round-trip: missing separator, mangled status line, or
/// header lines that no longer parse.
#[must_use]
pub fn parse_response(blob: &[u8]) -> Option<CachedResponse> {
    let separator = find_separator(blob)?;
    let head = std::str::from_utf8(&blob[..separator]).ok()?;
    let body = Bytes::copy_from_slice(&blob[separator + 4..]);

    let mut lines = head.split("\r\n");

    let status_line = lines.next()?;
    let code = status_line.split_whitespace().nth(1)?;
    let status = StatusCode::from_bytes(code.as_bytes()).ok()?;

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':')?;
        let name: HeaderName = name.trim().parse().ok()?;
        let value: HeaderValue = value.trim().parse().ok()?;
        headers.append(name, value);
    }

    Some(CachedResponse {
        status,
        headers,
        body,
    })
}

fn find_separator(blob: &[u8]) -> Option<usize> {
    blob.windows(4).position(|w| w == b"\r\n\r\n")
}
