use super::{ShortlinkCache, ShortlinkKey, ShortlinkTtl};
use crate::error::map_redis_error;
use crate::{CacheError, Result};
use async_trait::async_trait;
use billboard_core::ShortlinkTarget;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

const DEFAULT_PREFIX: &str = "bb:sl:";
const NEGATIVE_PREFIX: &str = "nf:";

/// A Redis-based implementation of [`ShortlinkCache`].
///
/// Positive entries are stored as JSON strings under `{prefix}{tenant}:{code}`;
/// negative markers live under `nf:{prefix}{tenant}:{code}`. Both are written
/// with `PSETEX`, so expiry is enforced by Redis, and reads report the
/// remaining lifetime from `PTTL`.
#[derive(Debug, Clone)]
pub struct RedisShortlinkCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
    ttl: ShortlinkTtl,
}

impl RedisShortlinkCache {
    /// Creates a new Redis shortlink cache.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `ttl` - Lifetimes of the positive and negative tiers
    pub fn new(conn: redis::aio::MultiplexedConnection, ttl: ShortlinkTtl) -> Self {
        Self::with_prefix(conn, ttl, DEFAULT_PREFIX)
    }

    /// Creates a new Redis shortlink cache with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        ttl: ShortlinkTtl,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    fn found_key(&self, key: &ShortlinkKey) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn missing_key(&self, key: &ShortlinkKey) -> String {
        format!("{}{}{}", NEGATIVE_PREFIX, self.key_prefix, key)
    }
}

/// Converts a `PTTL` reply. `-2` means the key is gone; `-1` means it has no
/// expiry, which only happens if something else wrote it, so the configured
/// lifetime is assumed.
fn remaining(pttl: i64, configured: Duration) -> Option<Duration> {
    match pttl {
        -2 | 0 => None,
        ms if ms < 0 => Some(configured),
        ms => Some(Duration::from_millis(ms as u64)),
    }
}

fn millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl ShortlinkCache for RedisShortlinkCache {
    async fn get_target_with_ttl(
        &self,
        key: &ShortlinkKey,
    ) -> Result<Option<(ShortlinkTarget, Duration)>> {
        let redis_key = self.found_key(key);
        trace!(key = %key, "Fetching shortlink target from Redis");

        let mut conn = self.conn.clone();
        let reply = redis::pipe()
            .get(&redis_key)
            .pttl(&redis_key)
            .query_async::<(Option<String>, i64)>(&mut conn)
            .await;

        match reply {
            Ok((Some(cached), pttl)) => {
                let Some(left) = remaining(pttl, self.ttl.found) else {
                    trace!(key = %key, "Positive entry expired between GET and PTTL");
                    return Ok(None);
                };
                debug!(key = %key, "Positive hit in Redis");
                match serde_json::from_str::<ShortlinkTarget>(&cached) {
                    Ok(target) => Ok(Some((target, left))),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to deserialize cached target");
                        Err(CacheError::InvalidData(format!(
                            "invalid cached value for key '{redis_key}': {e}"
                        )))
                    }
                }
            }
            Ok((None, _)) => {
                trace!(key = %key, "Positive miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn put_target(&self, key: &ShortlinkKey, target: &ShortlinkTarget) -> Result<()> {
        self.put_target_with_ttl(key, target, self.ttl.found).await
    }

    async fn put_target_with_ttl(
        &self,
        key: &ShortlinkKey,
        target: &ShortlinkTarget,
        ttl: Duration,
    ) -> Result<()> {
        let redis_key = self.found_key(key);

        let json = serde_json::to_string(target).map_err(|e| {
            CacheError::Serialization(format!("failed to serialize cache value: {e}"))
        })?;

        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(&redis_key, json, millis(ttl.min(self.ttl.found)))
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Failed to cache target in Redis");
                map_redis_error("failed to write value to Redis", e)
            })?;

        debug!(key = %key, "Cached shortlink target in Redis");
        Ok(())
    }

    async fn missing_ttl(&self, key: &ShortlinkKey) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let pttl = conn
            .pttl::<_, i64>(self.missing_key(key))
            .await
            .map_err(|e| map_redis_error("failed to check negative marker in Redis", e))?;

        let left = remaining(pttl, self.ttl.missing);
        trace!(key = %key, missing = left.is_some(), "Checked negative tier in Redis");
        Ok(left)
    }

    async fn mark_missing(&self, key: &ShortlinkKey) -> Result<()> {
        self.mark_missing_with_ttl(key, self.ttl.missing).await
    }

    async fn mark_missing_with_ttl(&self, key: &ShortlinkKey, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(self.missing_key(key), "1", millis(ttl.min(self.ttl.missing)))
            .await
            .map_err(|e| map_redis_error("failed to write negative marker to Redis", e))?;

        debug!(key = %key, "Marked shortlink missing in Redis");
        Ok(())
    }

    async fn clear_missing(&self, key: &ShortlinkKey) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.missing_key(key))
            .await
            .map_err(|e| map_redis_error("failed to delete negative marker from Redis", e))
    }
}
