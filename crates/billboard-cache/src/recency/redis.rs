use crate::error::map_redis_error;
use crate::Result;
use async_trait::async_trait;
use billboard_core::recency::recency_key;
use billboard_core::{AdCode, RecencyStore, TenantId, UserKey};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Recency windows stored as Redis lists.
///
/// The head of the list is the most recently delivered code. A push runs
/// `LPUSH`, `LTRIM` and `EXPIRE` in one `MULTI` block, so the window length
/// bound and its expiry are refreshed together.
#[derive(Debug, Clone)]
pub struct RedisRecencyStore {
    conn: redis::aio::MultiplexedConnection,
    ttl: Duration,
}

impl RedisRecencyStore {
    /// Creates a store whose windows expire six hours after the last push.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_ttl(conn, DEFAULT_TTL)
    }

    pub fn with_ttl(conn: redis::aio::MultiplexedConnection, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl RecencyStore for RedisRecencyStore {
    async fn recent(&self, tenant: TenantId, user: &UserKey, n: usize) -> Result<Vec<AdCode>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let key = recency_key(tenant, user);
        let mut conn = self.conn.clone();
        let codes = conn
            .lrange::<_, Vec<String>>(&key, 0, n as isize - 1)
            .await
            .map_err(|e| {
                warn!(tenant = %tenant, error = %e, "Redis error reading recency window");
                map_redis_error("failed to read recency window", e)
            })?;

        trace!(tenant = %tenant, count = codes.len(), "Read recency window from Redis");
        Ok(codes.into_iter().map(AdCode::from).collect())
    }

    async fn push(
        &self,
        tenant: TenantId,
        user: &UserKey,
        codes: &[AdCode],
        n: usize,
    ) -> Result<()> {
        if codes.is_empty() || n == 0 {
            return Ok(());
        }

        let key = recency_key(tenant, user);
        // LPUSH inserts one element at a time at the head; feeding the batch
        // reversed leaves codes[0] first.
        let batch: Vec<&str> = codes.iter().rev().map(AdCode::as_str).collect();

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lpush(&key, batch)
            .ignore()
            .ltrim(&key, 0, n as isize - 1)
            .ignore()
            .expire(&key, self.ttl.as_secs().max(1) as i64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to push recency window", e))?;

        debug!(tenant = %tenant, pushed = codes.len(), "Pushed recency window to Redis");
        Ok(())
    }
}

// Tests requiring a running Redis instance live in tests/redis_integration.rs.
