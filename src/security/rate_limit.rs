//! Fixed-window per-client rate limiting backed by the key-value store.
//!
//! Counters live under `rate:<client>` with a TTL equal to the window,
//! created lazily on a client's first request. The window is not
//! sliding: a burst straddling the boundary can consume up to twice
//! the limit. Store failures fail open — a broken limiter must never
//! refuse traffic the proxy could serve.

use std::sync::Arc;

use crate::store::KvStore;

pub struct RateLimiter {
    store: Option<Arc<dyn KvStore>>,
    limit: u32,
    window_seconds: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Option<Arc<dyn KvStore>>, limit: u32, window_seconds: u64) -> Self {
        Self {
            store,
            limit,
            window_seconds,
        }
    }

    /// Whether this client may proceed. Limiting is disabled when no
    /// store is configured or when the limit/window is zero.
    pub async fn allow(&self, client: &str) -> bool {
        let Some(store) = self.store.as_deref() else {
            return true;
        };
        if self.limit == 0 || self.window_seconds == 0 {
            return true;
        }

        let key = format!("rate:{client}");

        let count = match store.get(&key).await {
            Ok(value) => value.and_then(parse_count).unwrap_or(0),
            Err(e) => {
                tracing::warn!(client = %client, error = %e, "rate-limit store read failed, allowing");
                return true;
            }
        };

        if count == 0 {
            if let Err(e) = store.set_ex(&key, b"1", self.window_seconds).await {
                tracing::warn!(client = %client, error = %e, "rate-limit window open failed, allowing");
            }
            return true;
        }

        if count < i64::from(self.limit) {
            if let Err(e) = store.incr(&key).await {
                tracing::warn!(client = %client, error = %e, "rate-limit increment failed, allowing");
            }
            return true;
        }

        false
    }
}

fn parse_count(raw: Vec<u8>) -> Option<i64> {
    std::str::from_utf8(&raw).ok()?.trim().parse().ok()
}
