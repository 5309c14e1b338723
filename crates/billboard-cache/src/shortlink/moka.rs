use super::{ShortlinkCache, ShortlinkKey, ShortlinkTtl};
use crate::Result;
use async_trait::async_trait;
use billboard_core::ShortlinkTarget;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

const DEFAULT_CAPACITY: u64 = 10_000;

/// A cached value together with the lifetime it was stored for.
#[derive(Debug, Clone)]
struct Expiring<V> {
    value: V,
    ttl: Duration,
    stored_at: Instant,
}

impl<V> Expiring<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            stored_at: Instant::now(),
        }
    }

    /// `None` once the lifetime has run out.
    fn remaining(&self) -> Option<Duration> {
        let left = self.ttl.saturating_sub(self.stored_at.elapsed());
        (!left.is_zero()).then_some(left)
    }
}

/// Expires every entry after the lifetime it carries.
struct PerEntryTtl;

impl<K, V> Expiry<K, Expiring<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        value: &Expiring<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &Expiring<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-memory shortlink cache using Moka.
///
/// Each tier is a separate Moka cache, so a negative marker expires on its
/// short TTL regardless of how long the positive tier keeps entries. Entries
/// written with an explicit lifetime keep the shorter of that lifetime and
/// the tier's own. Suitable for single-node deployments or as the L1 in
/// front of Redis.
#[derive(Debug, Clone)]
pub struct MokaShortlinkCache {
    found: Cache<ShortlinkKey, Expiring<ShortlinkTarget>>,
    missing: Cache<ShortlinkKey, Expiring<()>>,
    ttl: ShortlinkTtl,
}

impl MokaShortlinkCache {
    /// Creates a cache with the default capacity of 10,000 entries per tier.
    pub fn new(ttl: ShortlinkTtl) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, ttl)
    }

    /// Creates a cache with a custom maximum capacity per tier.
    pub fn with_capacity(max_capacity: u64, ttl: ShortlinkTtl) -> Self {
        Self::builder()
            .max_capacity(max_capacity)
            .ttl(ttl)
            .build()
            .into()
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> ShortlinkCacheConfigBuilder {
        ShortlinkCacheConfig::builder()
    }
}

impl Default for MokaShortlinkCache {
    fn default() -> Self {
        Self::new(ShortlinkTtl::default())
    }
}

#[async_trait]
impl ShortlinkCache for MokaShortlinkCache {
    async fn get_target_with_ttl(
        &self,
        key: &ShortlinkKey,
    ) -> Result<Option<(ShortlinkTarget, Duration)>> {
        let hit = self
            .found
            .get(key)
            .await
            .and_then(|entry| entry.remaining().map(|left| (entry.value, left)));

        match hit {
            Some(hit) => {
                debug!(key = %key, "Positive hit in Moka");
                Ok(Some(hit))
            }
            None => {
                trace!(key = %key, "Positive miss in Moka");
                Ok(None)
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
        let ttl = ttl.min(self.ttl.found);
        self.found
            .insert(key.clone(), Expiring::new(target.clone(), ttl))
            .await;
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cached shortlink target in Moka");
        Ok(())
    }

    async fn missing_ttl(&self, key: &ShortlinkKey) -> Result<Option<Duration>> {
        let left = self
            .missing
            .get(key)
            .await
            .and_then(|entry| entry.remaining());
        trace!(key = %key, missing = left.is_some(), "Checked negative tier in Moka");
        Ok(left)
    }

    async fn mark_missing(&self, key: &ShortlinkKey) -> Result<()> {
        self.mark_missing_with_ttl(key, self.ttl.missing).await
    }

    async fn mark_missing_with_ttl(&self, key: &ShortlinkKey, ttl: Duration) -> Result<()> {
        let ttl = ttl.min(self.ttl.missing);
        self.missing
            .insert(key.clone(), Expiring::new((), ttl))
            .await;
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Marked shortlink missing in Moka");
        Ok(())
    }

    async fn clear_missing(&self, key: &ShortlinkKey) -> Result<()> {
        self.missing.invalidate(key).await;
        Ok(())
    }
}

/// Configuration for creating a [`MokaShortlinkCache`] with custom settings.
#[derive(Debug, TypedBuilder)]
pub struct ShortlinkCacheConfig {
    /// Maximum number of entries each tier can hold.
    #[builder(default, setter(strip_option))]
    max_capacity: Option<u64>,
    /// Lifetimes of the positive and negative tiers.
    #[builder(default)]
    ttl: ShortlinkTtl,
}

impl From<ShortlinkCacheConfig> for MokaShortlinkCache {
    fn from(config: ShortlinkCacheConfig) -> Self {
        let mut found = Cache::builder().expire_after(PerEntryTtl);
        let mut missing = Cache::builder().expire_after(PerEntryTtl);

        if let Some(capacity) = config.max_capacity {
            found = found.max_capacity(capacity);
            missing = missing.max_capacity(capacity);
        }

        MokaShortlinkCache {
            found: found.build(),
            missing: missing.build(),
            ttl: config.ttl,
        }
    }
}
