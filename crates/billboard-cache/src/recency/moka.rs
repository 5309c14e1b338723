use crate::Result;
use async_trait::async_trait;
use billboard_core::recency::recency_key;
use billboard_core::{AdCode, RecencyStore, TenantId, UserKey};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

const DEFAULT_MAX_WINDOWS: u64 = 100_000;

/// In-process recency windows held in a Moka cache.
///
/// The number of users tracked is bounded by the cache capacity; the least
/// valuable windows are evicted once the bound is hit. An optional TTL,
/// restarted by every push, drops idle windows the way the Redis store does.
/// Each window is an immutable slice replaced on every push through Moka's
/// per-key atomic upsert.
#[derive(Debug, Clone)]
pub struct MokaRecencyStore {
    windows: Cache<String, Arc<[AdCode]>>,
}

impl MokaRecencyStore {
    /// Creates a store tracking up to 100,000 users.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_WINDOWS)
    }

    /// Creates a store tracking up to `max_windows` users.
    pub fn with_capacity(max_windows: u64) -> Self {
        Self {
            windows: Cache::builder().max_capacity(max_windows).build(),
        }
    }

    /// Creates a store whose windows expire `ttl` after their last push.
    pub fn with_ttl(max_windows: u64, ttl: Duration) -> Self {
        Self {
            windows: Cache::builder()
                .max_capacity(max_windows)
                .time_to_live(ttl)
                .build(),
        }
    }
}

impl Default for MokaRecencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecencyStore for MokaRecencyStore {
    async fn recent(&self, tenant: TenantId, user: &UserKey, n: usize) -> Result<Vec<AdCode>> {
        let key = recency_key(tenant, user);
        let codes = self
            .windows
            .get(&key)
            .await
            .map(|window| window.iter().take(n).cloned().collect())
            .unwrap_or_default();
        Ok(codes)
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
        self.windows
            .entry(key)
            .and_upsert_with(|existing| {
                let mut window: Vec<AdCode> = codes.to_vec();
                if let Some(entry) = existing {
                    window.extend(entry.into_value().iter().cloned());
                }
                window.truncate(n);
                std::future::ready(Arc::<[AdCode]>::from(window))
            })
            .await;

        trace!(tenant = %tenant, pushed = codes.len(), "Pushed recency window to Moka");
        Ok(())
    }
}
