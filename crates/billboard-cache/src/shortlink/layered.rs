use super::{ShortlinkCache, ShortlinkKey};
use crate::Result;
use async_trait::async_trait;
use billboard_core::ShortlinkTarget;
use std::time::Duration;
use tracing::{debug, trace};

/// A multi-layer shortlink cache that composes two cache implementations.
///
/// L1 is typically a fast, local cache (e.g. [`MokaShortlinkCache`]) and L2
/// a shared cache (e.g. [`RedisShortlinkCache`]). Both tiers are layered the
/// same way:
///
/// - **Read**: Try L1 first; on a miss try L2 and backfill L1 on a hit.
/// - **Write**: Write to L2 first, then L1.
/// - **Clear**: Remove from L1, then L2.
///
/// A backfilled entry gets only the lifetime L2 had left, so it never
/// outlives its L2 source.
///
/// [`MokaShortlinkCache`]: super::MokaShortlinkCache
/// [`RedisShortlinkCache`]: super::RedisShortlinkCache
#[derive(Debug, Clone)]
pub struct LayeredShortlinkCache<L1, L2> {
    l1: L1,
    l2: L2,
}

impl<L1, L2> LayeredShortlinkCache<L1, L2> {
    /// Creates a new layered cache with the given L1 and L2 caches.
    pub fn new(l1: L1, l2: L2) -> Self {
        Self { l1, l2 }
    }

    /// Returns a reference to the L1 cache.
    pub fn l1(&self) -> &L1 {
        &self.l1
    }

    /// Returns a reference to the L2 cache.
    pub fn l2(&self) -> &L2 {
        &self.l2
    }
}

#[async_trait]
impl<L1, L2> ShortlinkCache for LayeredShortlinkCache<L1, L2>
where
    L1: ShortlinkCache,
    L2: ShortlinkCache,
{
    async fn get_target_with_ttl(
        &self,
        key: &ShortlinkKey,
    ) -> Result<Option<(ShortlinkTarget, Duration)>> {
        if let Some(hit) = self.l1.get_target_with_ttl(key).await? {
            debug!(key = %key, "L1 positive hit");
            return Ok(Some(hit));
        }

        trace!(key = %key, "L1 positive miss, trying L2");
        match self.l2.get_target_with_ttl(key).await? {
            Some((target, left)) => {
                debug!(key = %key, "L2 positive hit, backfilling L1");
                self.l1.put_target_with_ttl(key, &target, left).await?;
                Ok(Some((target, left)))
            }
            None => {
                trace!(key = %key, "L2 positive miss");
                Ok(None)
            }
        }
    }

    async fn put_target(&self, key: &ShortlinkKey, target: &ShortlinkTarget) -> Result<()> {
        self.l2.put_target(key, target).await?;
        self.l1.put_target(key, target).await?;
        debug!(key = %key, "Stored target in L2 and L1");
        Ok(())
    }

    async fn put_target_with_ttl(
        &self,
        key: &ShortlinkKey,
        target: &ShortlinkTarget,
        ttl: Duration,
    ) -> Result<()> {
        self.l2.put_target_with_ttl(key, target, ttl).await?;
        self.l1.put_target_with_ttl(key, target, ttl).await?;
        Ok(())
    }

    async fn missing_ttl(&self, key: &ShortlinkKey) -> Result<Option<Duration>> {
        if let Some(left) = self.l1.missing_ttl(key).await? {
            debug!(key = %key, "L1 negative hit");
            return Ok(Some(left));
        }

        let left = self.l2.missing_ttl(key).await?;
        if let Some(left) = left {
            debug!(key = %key, "L2 negative hit, backfilling L1");
            self.l1.mark_missing_with_ttl(key, left).await?;
        }
        Ok(left)
    }

    async fn mark_missing(&self, key: &ShortlinkKey) -> Result<()> {
        self.l2.mark_missing(key).await?;
        self.l1.mark_missing(key).await?;
        Ok(())
    }

    async fn mark_missing_with_ttl(&self, key: &ShortlinkKey, ttl: Duration) -> Result<()> {
        self.l2.mark_missing_with_ttl(key, ttl).await?;
        self.l1.mark_missing_with_ttl(key, ttl).await?;
        Ok(())
    }

    async fn clear_missing(&self, key: &ShortlinkKey) -> Result<()> {
        self.l1.clear_missing(key).await?;
        self.l2.clear_missing(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortlink::{MokaShortlinkCache, ShortlinkTtl};
    use billboard_core::{ShortCode, TenantId};

    fn key(code: &str) -> ShortlinkKey {
        ShortlinkKey::new(TenantId::new(1), ShortCode::new_unchecked(code))
    }

    fn target(url: &str) -> ShortlinkTarget {
        ShortlinkTarget {
            url: url.to_string(),
            ad_id: "uuid-1".to_string(),
        }
    }

    fn create_test_cache() -> LayeredShortlinkCache<MokaShortlinkCache, MokaShortlinkCache> {
        let l1 = MokaShortlinkCache::with_capacity(100, ShortlinkTtl::default());
        let l2 = MokaShortlinkCache::with_capacity(100, ShortlinkTtl::default());
        LayeredShortlinkCache::new(l1, l2)
    }

    #[tokio::test]
    async fn get_from_l1() {
        let cache = create_test_cache();
        let k = key("abc");

        cache.l1().put_target(&k, &target("https://example.com")).await.unwrap();

        let result = cache.get_target(&k).await.unwrap();
        assert_eq!(result, Some(target("https://example.com")));
        assert!(cache.l2().get_target(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_backfills_l1_from_l2() {
        let cache = create_test_cache();
        let k = key("abc");

        cache.l2().put_target(&k, &target("https://example.com")).await.unwrap();
        assert!(cache.l1().get_target(&k).await.unwrap().is_none());

        let result = cache.get_target(&k).await.unwrap();
        assert_eq!(result, Some(target("https://example.com")));

        assert_eq!(
            cache.l1().get_target(&k).await.unwrap(),
            Some(target("https://example.com"))
        );
    }

    #[tokio::test]
    async fn put_writes_to_both() {
        let cache = create_test_cache();
        let k = key("abc");

        cache.put_target(&k, &target("https://example.com")).await.unwrap();

        assert!(cache.l1().get_target(&k).await.unwrap().is_some());
        assert!(cache.l2().get_target(&k).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn negative_marker_backfills_l1() {
        let cache = create_test_cache();
        let k = key("nope");

        cache.l2().mark_missing(&k).await.unwrap();
        assert!(!cache.l1().is_missing(&k).await.unwrap());

        assert!(cache.is_missing(&k).await.unwrap());
        assert!(cache.l1().is_missing(&k).await.unwrap());
    }

    #[tokio::test]
    async fn backfilled_negative_marker_expires_with_l2() {
        let ttl = ShortlinkTtl::new(Duration::from_secs(60), Duration::from_millis(400));
        let cache = LayeredShortlinkCache::new(
            MokaShortlinkCache::with_capacity(100, ttl),
            MokaShortlinkCache::with_capacity(100, ttl),
        );
        let k = key("nope");

        cache.l2().mark_missing(&k).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(cache.is_missing(&k).await.unwrap());
        assert!(cache.l1().is_missing(&k).await.unwrap());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(!cache.l2().is_missing(&k).await.unwrap());
        assert!(!cache.is_missing(&k).await.unwrap());
    }

    #[tokio::test]
    async fn backfilled_target_expires_with_l2() {
        let ttl = ShortlinkTtl::new(Duration::from_millis(400), Duration::from_secs(60));
        let cache = LayeredShortlinkCache::new(
            MokaShortlinkCache::with_capacity(100, ttl),
            MokaShortlinkCache::with_capacity(100, ttl),
        );
        let k = key("abc");

        cache.l2().put_target(&k, &target("https://example.com")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (_, left) = cache.get_target_with_ttl(&k).await.unwrap().unwrap();
        assert!(left <= Duration::from_millis(200));

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(cache.get_target(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_missing_removes_from_both() {
        let cache = create_test_cache();
        let k = key("nope");

        cache.mark_missing(&k).await.unwrap();
        assert!(cache.l1().is_missing(&k).await.unwrap());
        assert!(cache.l2().is_missing(&k).await.unwrap());

        cache.clear_missing(&k).await.unwrap();

        assert!(!cache.l1().is_missing(&k).await.unwrap());
        assert!(!cache.l2().is_missing(&k).await.unwrap());
    }

    #[tokio::test]
    async fn miss_when_both_empty() {
        let cache = create_test_cache();
        let k = key("abc");

        assert!(cache.get_target(&k).await.unwrap().is_none());
        assert!(!cache.is_missing(&k).await.unwrap());
    }
}
