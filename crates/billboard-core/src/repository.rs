use crate::ad::{Ad, AdTypeId};
use crate::error::Result;
use crate::shortcode::ShortCode;
use crate::tenant::TenantId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of truth for the ads a tenant currently runs.
#[async_trait]
pub trait AdRepository: Send + Sync + 'static {
    /// Returns the tenant's active ads that offer at least one of `types`.
    ///
    /// Implementations apply the "active" predicate (enabled, not
    /// soft-deleted, inside the validity window) and skip rows whose stored
    /// type descriptor cannot be parsed. An empty `types` slice yields an
    /// empty list.
    async fn active_ads(&self, tenant: TenantId, types: &[AdTypeId]) -> Result<Vec<Ad>>;
}

/// Destination of a resolved shortlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlinkTarget {
    /// The URL to redirect to.
    pub url: String,
    /// Identifier of the ad the shortlink belongs to, for click logging.
    pub ad_id: String,
}

/// Read access to shortlink mappings.
#[async_trait]
pub trait ShortlinkRepository: Send + Sync + 'static {
    /// Resolves a code for a tenant.
    ///
    /// Returns `Ok(None)` when no live mapping exists. Errors are reserved for
    /// backend failures and must never be reported as `Ok(None)`.
    async fn resolve(&self, tenant: TenantId, code: &ShortCode) -> Result<Option<ShortlinkTarget>>;
}
