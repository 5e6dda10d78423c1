//! Networked primary cache backend.
//!
//! Thin adapter over a multiplexed Redis connection manager. The manager
//! reconnects on its own; every error is still mapped to `CacheError` so the
//! tier above can downgrade instead of surfacing it.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{CacheBackend, CacheError};

#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Open a connection manager against `url`.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the URL is malformed or the initial
    /// connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(redis_err)?;
        let manager = client.get_connection_manager().await.map_err(redis_err)?;
        Ok(Self { manager })
    }
}

fn redis_err(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await.map_err(redis_err)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let () = conn
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let () = conn.del(key).await.map_err(redis_err)?;
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.manager.clone();
        let ttl_secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
        // INCRBY + EXPIRE in one round trip; the TTL refresh keeps hot
        // counters alive the same way SETEX does for plain values.
        let (next, _): (i64, i64) = redis::pipe()
            .incr(key, delta)
            .expire(key, ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(next)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await.map_err(redis_err)?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend(format!("unexpected ping reply: {pong}")))
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
