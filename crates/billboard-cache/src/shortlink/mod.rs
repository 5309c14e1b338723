//! Positive and negative caches for shortlink resolution.

pub mod layered;
pub mod moka;
pub mod redis;

use crate::Result;
use async_trait::async_trait;
use billboard_core::{ShortCode, ShortlinkTarget, TenantId};
use std::fmt::Display;
use std::time::Duration;

pub use self::moka::MokaShortlinkCache;
pub use self::redis::RedisShortlinkCache;
pub use layered::LayeredShortlinkCache;

/// Cache key of a shortlink: codes are scoped by tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortlinkKey {
    pub tenant: TenantId,
    pub code: ShortCode,
}

impl ShortlinkKey {
    pub fn new(tenant: TenantId, code: ShortCode) -> Self {
        Self { tenant, code }
    }
}

impl Display for ShortlinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tenant, self.code)
    }
}

/// Lifetimes of the two cache tiers.
///
/// Confirmed mappings are assumed stable and kept for a long time; confirmed
/// absences are kept briefly so a code created later is picked up soon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortlinkTtl {
    /// Lifetime of a positive entry.
    pub found: Duration,
    /// Lifetime of a negative marker.
    pub missing: Duration,
}

impl ShortlinkTtl {
    pub fn new(found: Duration, missing: Duration) -> Self {
        Self { found, missing }
    }
}

impl Default for ShortlinkTtl {
    fn default() -> Self {
        Self {
            found: Duration::from_secs(24 * 60 * 60),
            missing: Duration::from_secs(4 * 60),
        }
    }
}

/// A two-tier cache for shortlink lookups.
///
/// The positive tier maps a key to its [`ShortlinkTarget`]; the negative
/// tier records that the repository confirmed the key absent. Each tier
/// applies its own TTL, configured on the implementation.
///
/// Reads can report how long an entry has left and writes can take an
/// explicit lifetime, so an entry copied between caches expires when its
/// source does.
#[async_trait]
pub trait ShortlinkCache: Send + Sync + 'static {
    /// Get a cached target and its remaining lifetime.
    async fn get_target_with_ttl(
        &self,
        key: &ShortlinkKey,
    ) -> Result<Option<(ShortlinkTarget, Duration)>>;

    /// Get a cached target.
    ///
    /// Returns `Ok(None)` if the key is not in the positive tier.
    async fn get_target(&self, key: &ShortlinkKey) -> Result<Option<ShortlinkTarget>> {
        Ok(self
            .get_target_with_ttl(key)
            .await?
            .map(|(target, _)| target))
    }

    /// Store a target in the positive tier for the configured lifetime.
    async fn put_target(&self, key: &ShortlinkKey, target: &ShortlinkTarget) -> Result<()>;

    /// Store a target for at most `ttl`.
    async fn put_target_with_ttl(
        &self,
        key: &ShortlinkKey,
        target: &ShortlinkTarget,
        ttl: Duration,
    ) -> Result<()>;

    /// Remaining lifetime of the key's negative marker, `None` if it has none.
    async fn missing_ttl(&self, key: &ShortlinkKey) -> Result<Option<Duration>>;

    /// Returns `true` if the key carries a live negative marker.
    async fn is_missing(&self, key: &ShortlinkKey) -> Result<bool> {
        Ok(self.missing_ttl(key).await?.is_some())
    }

    /// Record the key as confirmed absent for the configured lifetime.
    async fn mark_missing(&self, key: &ShortlinkKey) -> Result<()>;

    /// Record the key as confirmed absent for at most `ttl`.
    async fn mark_missing_with_ttl(&self, key: &ShortlinkKey, ttl: Duration) -> Result<()>;

    /// Remove a negative marker. It is not an error if none exists.
    async fn clear_missing(&self, key: &ShortlinkKey) -> Result<()>;
}
