//! Key-value store abstraction backing the response cache and the
//! rate limiter.
//!
//! [`KvStore`] captures the minimal wire surface both consumers need:
//! `GET`, `SET key value EX ttl`, and atomic `INCR`. Any store offering
//! those with TTL semantics is conformant; [`redis_store::RedisStore`]
//! is the production implementation. Callers are expected to treat
//! store failures as degradation, never as request failures.

pub mod redis_store;

use async_trait::async_trait;

use crate::error::JunctionError;

// async_trait is required here because KvStore is used as Arc<dyn KvStore>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait KvStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch a value; `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, JunctionError>;

    /// Store a value that expires after `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), JunctionError>;

    /// Atomically increment an integer value, returning the new count.
    async fn incr(&self, key: &str) -> Result<i64, JunctionError>;
}
