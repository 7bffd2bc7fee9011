//! Redis-backed [`KvStore`] over a multiplexed Tokio connection.
//!
//! The multiplexed connection is cheap to clone and safe to share
//! across request tasks, so each operation clones the handle instead
//! of serializing behind a lock. Connection loss surfaces as per-call
//! errors which the cache and rate limiter swallow.

use async_trait::async_trait;
use redis::AsyncCommands;

use super::KvStore;
use crate::error::JunctionError;

pub struct RedisStore {
    connection: redis::aio::MultiplexedConnection,
}

fn store_err(e: redis::RedisError) -> JunctionError {
    JunctionError::Store {
        backend: "redis",
        source: Box::new(e),
    }
}

impl RedisStore {
    /// Connect to redis using a URL built from the config
    /// (`redis://[:password@]host:port/`).
    pub async fn connect(url: &str) -> Result<Self, JunctionError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, JunctionError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(store_err)?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), JunctionError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, JunctionError> {
        let mut conn = self.connection.clone();
        let count: i64 = conn.incr(key, 1).await.map_err(store_err)?;
        Ok(count)
    }
}
