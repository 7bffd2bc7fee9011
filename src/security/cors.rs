//! Cross-origin response annotation.
//!
//! Every egress response — rejections included — is offered to
//! [`apply`]. Headers are attached only when the request carried an
//! `Origin` that matches the configured allow-list; `*` in the list
//! matches any origin, and the response echoes the concrete origin
//! rather than the wildcard.

use axum::http::header::{HeaderMap, HeaderValue};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Origin, Content-Type, Accept, Authorization, X-Requested-With";
const MAX_AGE: &str = "3600";

pub fn apply(
    origin: Option<&HeaderValue>,
    allowed_origins: &[String],
    response_headers: &mut HeaderMap,
) {
    let Some(origin) = origin else {
        return; // Not a CORS request
    };
    let Ok(origin_str) = origin.to_str() else {
        return;
    };

    let allowed = allowed_origins
        .iter()
        .any(|candidate| candidate == "*" || candidate == origin_str);
    if !allowed {
        return;
    }

    response_headers.insert("access-control-allow-origin", origin.clone());
    response_headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    response_headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response_headers.insert(
        "access-control-allow-credentials",
        HeaderValue::from_static("true"),
    );
    response_headers.insert("access-control-max-age", HeaderValue::from_static(MAX_AGE));
}
