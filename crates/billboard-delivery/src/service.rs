use crate::cache::TenantAdCache;
use crate::error::{DeliveryError, Result};
use crate::rules::PlacementRules;
use crate::selection::{select, SelectedAd};
use billboard_core::{
    Ad, AdCode, AdEvent, AdRepository, AdTypeId, ClientIdentity, EventKind, EventLog,
    RecencyStore, TenantId, UserKey,
};
use jiff::Timestamp;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

const DEFAULT_RECENT_WINDOW: usize = 5;

/// One ad request as seen by the delivery engine.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub tenant: TenantId,
    pub placement: String,
    /// Per-request bounds for the placement's unlimited types.
    pub overrides: HashMap<AdTypeId, i64>,
    pub client: ClientIdentity,
    pub user_agent: String,
    pub referrer: String,
}

/// The ads chosen for a request, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    pub ads: Vec<SelectedAd>,
}

/// Tunables for [`DeliveryService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct DeliverySettings {
    /// How many recently shown codes are remembered per user.
    #[builder(default = DEFAULT_RECENT_WINDOW)]
    pub recent_window: usize,
    /// Placement quota tables.
    #[builder(default)]
    pub placements: PlacementRules,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Serves ad requests from the tenant cache.
///
/// Degraded dependencies never fail a request: a recency read error means no
/// recency filtering, a recency write or view-log error is logged, and a
/// failed cold-cache fallback serves nothing.
#[derive(Clone)]
pub struct DeliveryService {
    cache: TenantAdCache,
    repository: Arc<dyn AdRepository>,
    recency: Arc<dyn RecencyStore>,
    events: Arc<dyn EventLog>,
    settings: Arc<DeliverySettings>,
    catalog: Arc<[AdTypeId]>,
}

impl DeliveryService {
    pub fn new(
        cache: TenantAdCache,
        repository: Arc<dyn AdRepository>,
        recency: Arc<dyn RecencyStore>,
        events: Arc<dyn EventLog>,
        settings: DeliverySettings,
    ) -> Self {
        let catalog: Arc<[AdTypeId]> = Arc::from(settings.placements.catalog());
        Self {
            cache,
            repository,
            recency,
            events,
            settings: Arc::new(settings),
            catalog,
        }
    }

    /// Type ids the cache is populated with.
    pub fn catalog(&self) -> &[AdTypeId] {
        &self.catalog
    }

    pub async fn deliver(&self, request: &DeliveryRequest) -> Result<Delivery> {
        let rules = self
            .settings
            .placements
            .resolve(&request.placement, &request.overrides)
            .ok_or_else(|| DeliveryError::UnknownPlacement(request.placement.clone()))?;

        let pool = self.pool(request.tenant).await;
        let user = UserKey::fingerprint(&request.client.raw_ip, &request.user_agent);
        let recent = self.recent(request.tenant, &user).await;

        let selected = select(&pool, &rules, &recent, &mut rand::rng());
        debug!(
            tenant = %request.tenant,
            placement = %request.placement,
            pool = pool.len(),
            recent = recent.len(),
            selected = selected.len(),
            "Selected ads"
        );

        if !selected.is_empty() {
            self.record_views(request, &selected).await;
            self.remember(request.tenant, &user, &selected).await;
        }

        Ok(Delivery { ads: selected })
    }

    /// The tenant's snapshot, or a direct repository read when it is empty.
    async fn pool(&self, tenant: TenantId) -> Arc<[Ad]> {
        let snapshot = self.cache.get(tenant);
        if !snapshot.is_empty() {
            return snapshot.ads.clone();
        }

        debug!(tenant = %tenant, "Ad cache empty, querying repository");
        match self.repository.active_ads(tenant, &self.catalog).await {
            Ok(ads) if !ads.is_empty() => {
                self.cache.set(tenant, ads);
                self.cache.get(tenant).ads.clone()
            }
            Ok(_) => {
                debug!(tenant = %tenant, "Repository has no active ads");
                snapshot.ads.clone()
            }
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "Cold cache fallback failed");
                snapshot.ads.clone()
            }
        }
    }

    async fn recent(&self, tenant: TenantId, user: &UserKey) -> HashSet<AdCode> {
        match self
            .recency
            .recent(tenant, user, self.settings.recent_window)
            .await
        {
            Ok(codes) => codes.into_iter().collect(),
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "Recency lookup failed, serving without it");
                HashSet::new()
            }
        }
    }

    async fn remember(&self, tenant: TenantId, user: &UserKey, selected: &[SelectedAd]) {
        let codes: Vec<AdCode> = selected.iter().map(|s| s.ad.code.clone()).collect();
        if let Err(e) = self
            .recency
            .push(tenant, user, &codes, self.settings.recent_window)
            .await
        {
            warn!(tenant = %tenant, error = %e, "Failed to update recency window");
        }
    }

    async fn record_views(&self, request: &DeliveryRequest, selected: &[SelectedAd]) {
        let occurred_at = Timestamp::now();

        for chosen in selected {
            if chosen.ad.id.is_empty() {
                debug!(tenant = %request.tenant, code = %chosen.ad.code, "Skipping view log for ad without id");
                continue;
            }

            let event = AdEvent {
                ad_id: chosen.ad.id.clone(),
                tenant: request.tenant,
                kind: EventKind::View,
                client: request.client.clone(),
                user_agent: request.user_agent.clone(),
                referrer: request.referrer.clone(),
                occurred_at,
            };
            if let Err(e) = self.events.record(&event).await {
                warn!(tenant = %request.tenant, ad = %event.ad_id, error = %e, "Failed to record view");
            }
        }
    }
}
