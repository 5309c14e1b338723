use crate::cache::TenantAdCache;
use billboard_core::error::Result as StorageResult;
use billboard_core::{AdRepository, AdTypeId, TenantId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Outcome of one pass over every tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<TenantId>,
    pub failed: Vec<TenantId>,
}

/// Periodically reloads tenant snapshots from the repository.
///
/// The refresh logic (`refresh_tenant`, `refresh_all`) is usable on its own;
/// [`CacheRefresher::start`] only adds the schedule around it.
pub struct CacheRefresher<R: ?Sized> {
    cache: TenantAdCache,
    repository: Arc<R>,
    tenants: Vec<TenantId>,
    types: Vec<AdTypeId>,
    period: Duration,
}

impl<R> CacheRefresher<R>
where
    R: AdRepository + ?Sized,
{
    pub fn new(
        cache: TenantAdCache,
        repository: Arc<R>,
        tenants: Vec<TenantId>,
        types: Vec<AdTypeId>,
        period: Duration,
    ) -> Self {
        Self {
            cache,
            repository,
            tenants,
            types,
            period,
        }
    }

    /// Reloads one tenant. On error the existing snapshot is left in place.
    pub async fn refresh_tenant(&self, tenant: TenantId) -> StorageResult<usize> {
        let ads = self.repository.active_ads(tenant, &self.types).await?;
        let count = ads.len();
        self.cache.set(tenant, ads);
        Ok(count)
    }

    /// Reloads every tenant independently.
    pub async fn refresh_all(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        for &tenant in &self.tenants {
            match self.refresh_tenant(tenant).await {
                Ok(count) => {
                    debug!(tenant = %tenant, count, "Refreshed tenant ads");
                    report.refreshed.push(tenant);
                }
                Err(e) => {
                    warn!(tenant = %tenant, error = %e, "Tenant refresh failed, keeping previous snapshot");
                    report.failed.push(tenant);
                }
            }
        }

        report
    }

    /// Refreshes every tenant once, then keeps refreshing in the background.
    ///
    /// The first background tick fires one period after this returns. The
    /// loop exits when `shutdown` flips to `true` or its sender is dropped;
    /// a refresh already in progress runs to completion first.
    pub async fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let report = self.refresh_all().await;
        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            period_secs = self.period.as_secs(),
            "Initial ad cache refresh complete"
        );

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Ad cache refresher shutting down");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let report = self.refresh_all().await;
                        debug!(
                            refreshed = report.refreshed.len(),
                            failed = report.failed.len(),
                            "Ad cache refresh tick"
                        );
                    }
                }
            }
        })
    }
}
