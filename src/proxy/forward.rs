//! Upstream request forwarding.
//!
//! Builds the backend URL from the selected backend and the original
//! path + query, relays the buffered request, and collects the full
//! response. Each hop runs under [`UPSTREAM_TIMEOUT`]; 3xx responses
//! with a `Location` are followed up to [`MAX_REDIRECTS`] deep, with
//! 301/302/303 downgrading to a body-less GET and 307/308 preserving
//! method and body.

use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::Full;

use crate::config::model::Backend;
use crate::error::JunctionError;
use crate::server::HttpClient;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_REDIRECTS: usize = 10;

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub async fn send(
    client: &HttpClient,
    backend: &Backend,
    method: &Method,
    uri: &Uri,
    request_headers: &HeaderMap,
    body: &Bytes,
) -> Result<UpstreamResponse, JunctionError> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let mut url = url::Url::parse(&format!("{}{}", backend.base_url(), path_and_query))
        .map_err(|e| JunctionError::UriParse {
            source: Box::new(e),
        })?;

    let mut method = method.clone();
    let mut body = body.clone();

    for _hop in 0..=MAX_REDIRECTS {
        let response = request_once(client, &url, &method, request_headers, &body).await?;

        if response.status.is_redirection() {
            if let Some(location) = response
                .headers
                .get(axum::http::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                url = url.join(location).map_err(|e| JunctionError::UriParse {
                    source: Box::new(e),
                })?;

                // Curl semantics: 303 (and legacy 301/302) re-issue as a
                // body-less GET; 307/308 keep the method and body.
                if matches!(
                    response.status,
                    StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
                ) && method != Method::GET
                    && method != Method::HEAD
                {
                    method = Method::GET;
                    body = Bytes::new();
                }
                continue;
            }
        }

        return Ok(response);
    }

    Err(JunctionError::HttpRequest {
        source: format!("redirect chain exceeded {MAX_REDIRECTS} hops").into(),
    })
}

async fn request_once(
    client: &HttpClient,
    url: &url::Url,
    method: &Method,
    request_headers: &HeaderMap,
    body: &Bytes,
) -> Result<UpstreamResponse, JunctionError> {
    let mut builder = hyper::Request::builder()
        .method(method.clone())
        .uri(url.as_str());

    // Relay every client header verbatim; Host is deliberately not
    // rewritten to the backend's authority. The body was buffered, so
    // the client's framing headers no longer describe it — hyper
    // recomputes them from the actual bytes.
    for (name, value) in request_headers {
        if name == axum::http::header::CONTENT_LENGTH
            || name == axum::http::header::TRANSFER_ENCODING
        {
            continue;
        }
        builder = builder.header(name, value);
    }

    let request = builder
        .body(Full::new(body.clone()))
        .map_err(|e| JunctionError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(UPSTREAM_TIMEOUT, client.request(request))
        .await
        .map_err(|_| JunctionError::UpstreamTimeout)?
        .map_err(|e| JunctionError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| JunctionError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    Ok(UpstreamResponse {
        status,
        headers,
        body,
    })
}
