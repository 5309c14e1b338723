use crate::Result;
use billboard_cache::{ShortlinkCache, ShortlinkKey};
use billboard_core::{ShortCode, ShortlinkRepository, ShortlinkTarget, TenantId};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Outcome of a shortlink lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ShortlinkTarget),
    /// The code is confirmed absent, or was recently.
    NotFound,
}

/// Resolves shortlinks through a tiered cache.
///
/// Lookup order is negative tier, positive tier, then the repository. A
/// repository hit is cached in the positive tier and clears any negative
/// marker; a repository miss sets a negative marker. Repository errors are
/// returned and leave both tiers untouched.
///
/// Cache failures never fail a lookup: read errors count as a miss and
/// write errors are logged. Concurrent lookups of the same uncached code may
/// each reach the repository.
#[derive(Debug)]
pub struct ShortlinkResolver<R: ?Sized, C: ?Sized> {
    repository: Arc<R>,
    cache: Arc<C>,
}

impl<R: ?Sized, C: ?Sized> Clone for ShortlinkResolver<R, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<R, C> ShortlinkResolver<R, C>
where
    R: ShortlinkRepository + ?Sized,
    C: ShortlinkCache + ?Sized,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>) -> Self {
        Self { repository, cache }
    }

    /// Returns a reference to the repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub async fn resolve(&self, tenant: TenantId, code: &ShortCode) -> Result<Resolution> {
        let key = ShortlinkKey::new(tenant, code.clone());
        trace!(key = %key, "Resolving shortlink");

        match self.cache.is_missing(&key).await {
            Ok(true) => {
                debug!(key = %key, "Negative tier hit");
                return Ok(Resolution::NotFound);
            }
            Ok(false) => {}
            Err(e) => warn!(key = %key, error = %e, "Negative tier read failed, treating as miss"),
        }

        match self.cache.get_target(&key).await {
            Ok(Some(target)) => {
                debug!(key = %key, "Positive tier hit");
                return Ok(Resolution::Found(target));
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Positive tier read failed, treating as miss"),
        }

        trace!(key = %key, "Cache miss, querying repository");
        match self.repository.resolve(tenant, code).await? {
            Some(target) => {
                if let Err(e) = self.cache.put_target(&key, &target).await {
                    warn!(key = %key, error = %e, "Failed to cache shortlink target");
                }
                if let Err(e) = self.cache.clear_missing(&key).await {
                    warn!(key = %key, error = %e, "Failed to clear negative marker");
                }
                debug!(key = %key, url = %target.url, "Resolved shortlink from repository");
                Ok(Resolution::Found(target))
            }
            None => {
                if let Err(e) = self.cache.mark_missing(&key).await {
                    warn!(key = %key, error = %e, "Failed to write negative marker");
                }
                debug!(key = %key, "Shortlink not found");
                Ok(Resolution::NotFound)
            }
        }
    }
}
