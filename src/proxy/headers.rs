//! Header policy for forwarded requests and upstream responses.
//!
//! Client request headers are relayed upstream untouched — `Host`
//! included. On the response side only `Content-Length` and
//! `Connection` are dropped: the body is fully buffered here, so both
//! are recomputed for the client-facing write. WebSocket upgrade
//! detection also lives here since it is purely a header predicate.

use axum::http::header::{HeaderMap, CONNECTION, CONTENT_LENGTH, UPGRADE};

/// Drop upstream headers the proxy recomputes locally.
pub fn strip_recomputed(headers: &mut HeaderMap) {
    headers.remove(CONTENT_LENGTH);
    headers.remove(CONNECTION);
}

/// `Upgrade: websocket` combined with `Connection: Upgrade` marks a
/// WebSocket handshake, which the HTTP port refuses.
#[must_use]
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));

    let connection_upgrade = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });

    upgrade && connection_upgrade
}
