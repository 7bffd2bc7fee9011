//! Core request dispatch engine.
//!
//! [`dispatch_handler`] is the Axum fallback that receives every
//! request and drives it through the admission pipeline (allow-list →
//! auth → rate limit), route lookup, the WebSocket refusal, the
//! response cache, backend selection, upstream forwarding, and
//! post-processing (cache write, compression). CORS headers are
//! attached to every egress, rejections included. No downstream
//! degradation — cache or rate store unavailable — ever fails a
//! request that would otherwise succeed; anything unhandled is caught
//! at the engine boundary as a 500.

pub mod forward;
pub mod headers;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::header::{HeaderValue, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;

use crate::compress;
use crate::error::JunctionError;
use crate::security::{self, auth, cors};
use crate::server::AppState;

/// Explicit per-request context handed to each stage.
#[derive(Debug)]
pub struct RequestContext {
    pub client_ip: String,
    pub correlation_id: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(addr: &SocketAddr, request_headers: &HeaderMap) -> Self {
        let correlation_id = request_headers
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        Self {
            client_ip: addr.ip().to_string(),
            correlation_id,
        }
    }
}

pub async fn dispatch_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = RequestContext::new(&addr, &request_headers);
    let origin = request_headers.get(ORIGIN).cloned();

    let mut response = match handle(&state, &ctx, &method, &uri, &request_headers, body).await {
        Ok(response) => response,
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                client_ip = %ctx.client_ip,
                error = %e,
                "request dispatch failed"
            );
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    };

    cors::apply(
        origin.as_ref(),
        &state.config.security.cors.allowed_origins,
        response.headers_mut(),
    );
    response
}

#[allow(clippy::too_many_lines)]
async fn handle(
    state: &AppState,
    ctx: &RequestContext,
    method: &Method,
    uri: &Uri,
    request_headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, JunctionError> {
    tracing::debug!(
        correlation_id = %ctx.correlation_id,
        client_ip = %ctx.client_ip,
        method = %method,
        uri = %uri,
        "request received"
    );

    // Admission: allow-list
    if !security::ip_allowed(&state.config.security.ip_whitelist, &ctx.client_ip) {
        tracing::warn!(
            correlation_id = %ctx.correlation_id,
            client_ip = %ctx.client_ip,
            "client not in allow-list"
        );
        return Ok(text_response(StatusCode::FORBIDDEN, "Forbidden"));
    }

    // Admission: bearer auth (OPTIONS bypasses for CORS pre-flight)
    if let Some(verifier) = &state.verifier {
        if method != Method::OPTIONS {
            match auth::extract_bearer(request_headers) {
                None => {
                    tracing::warn!(
                        correlation_id = %ctx.correlation_id,
                        client_ip = %ctx.client_ip,
                        "missing bearer token"
                    );
                    return Ok(text_response(StatusCode::UNAUTHORIZED, "Unauthorized"));
                }
                Some(token) if !verifier.verify(token) => {
                    return Ok(text_response(StatusCode::FORBIDDEN, "Forbidden"));
                }
                Some(_) => {}
            }
        }
    }

    // Admission: rate limit
    if !state.rate_limiter.allow(&ctx.client_ip).await {
        state.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            correlation_id = %ctx.correlation_id,
            client_ip = %ctx.client_ip,
            "rate limit exceeded"
        );
        return Ok(text_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded",
        ));
    }

    // Route lookup
    let path = uri.path();
    let Some(route) = state.routes.matches(path) else {
        tracing::warn!(
            correlation_id = %ctx.correlation_id,
            method = %method,
            path = %path,
            "no route matched"
        );
        return Ok(text_response(StatusCode::NOT_FOUND, "Not Found"));
    };

    // WebSocket handshakes are refused on the HTTP port
    if headers::is_websocket_upgrade(request_headers) {
        return Ok(text_response(
            StatusCode::BAD_REQUEST,
            "WebSocket connections should be made to the WebSocket port",
        ));
    }

    let uri_str = uri.to_string();

    // Cache read
    if route.cache_enabled {
        if let Some(cache) = &state.cache {
            if let Some(cached) = cache.read(method, &uri_str).await {
                state.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    correlation_id = %ctx.correlation_id,
                    uri = %uri_str,
                    "cache hit"
                );
                return Ok(build_response(cached.status, cached.headers, cached.body));
            }
        }
    }

    // Backend selection
    let Some(backend) = state.selector.select(route) else {
        return Ok(text_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "No backend available",
        ));
    };

    // Upstream forward
    let upstream = match forward::send(
        &state.http_client,
        &backend,
        method,
        uri,
        request_headers,
        &body,
    )
    .await
    {
        Ok(upstream) => upstream,
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                backend = %backend.name,
                error = %e,
                "upstream request failed"
            );
            return Ok(text_response_owned(
                StatusCode::BAD_GATEWAY,
                format!("Error forwarding request: {e}"),
            ));
        }
    };

    tracing::debug!(
        correlation_id = %ctx.correlation_id,
        backend = %backend.name,
        status = upstream.status.as_u16(),
        "upstream responded"
    );

    // Post-process: drop recomputed headers, cache, compress
    let mut response_headers = upstream.headers;
    headers::strip_recomputed(&mut response_headers);
    let mut response_body = upstream.body;

    if route.cache_enabled {
        if let Some(cache) = &state.cache {
            cache
                .write(
                    method,
                    &uri_str,
                    upstream.status,
                    &response_headers,
                    &response_body,
                    route.cache_ttl_seconds,
                )
                .await;
        }
    }

    if state.config.performance.gzip_enabled {
        compress::apply(request_headers, &mut response_headers, &mut response_body);
    }

    state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
    Ok(build_response(upstream.status, response_headers, response_body))
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn text_response(status: StatusCode, body: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

fn text_response_owned(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
