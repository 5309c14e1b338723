use async_trait::async_trait;
use billboard_core::error::{Result, StorageError};
use billboard_core::{
    Ad, AdCode, AdEvent, AdRepository, AdTypeId, EventLog, ShortCode, ShortlinkRepository,
    ShortlinkTarget, TenantId,
};
use dashmap::DashMap;
use jiff::Timestamp;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// An ad plus the lifecycle attributes the repository filters on.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAd {
    pub ad: Ad,
    pub enabled: bool,
    pub deleted: bool,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
}

impl StoredAd {
    /// Wraps an ad that is enabled with an open validity window.
    pub fn active(ad: Ad) -> Self {
        Self {
            ad,
            enabled: true,
            deleted: false,
            starts_at: None,
            ends_at: None,
        }
    }

    /// Whether the ad should be served at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.enabled
            && !self.deleted
            && self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| end > now)
    }
}

/// One entry of a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAd {
    pub tenant: TenantId,
    pub ad: Ad,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub starts_at: Option<Timestamp>,
    #[serde(default)]
    pub ends_at: Option<Timestamp>,
}

fn enabled_by_default() -> bool {
    true
}

impl From<SeedAd> for StoredAd {
    fn from(seed: SeedAd) -> Self {
        Self {
            ad: seed.ad,
            enabled: seed.enabled,
            deleted: false,
            starts_at: seed.starts_at,
            ends_at: seed.ends_at,
        }
    }
}

/// Contents of a JSON seed file: `{"ads": [{"tenant": 1, "ad": {...}}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub ads: Vec<SeedAd>,
}

/// An in-memory repository backed by `DashMap`.
///
/// Implements the ad, shortlink and event-log contracts with the same
/// filtering rules as the MySQL backend. Recorded events are kept in memory
/// and can be inspected with [`InMemoryRepository::events`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    ads: Arc<DashMap<(TenantId, AdCode), StoredAd>>,
    events: Arc<Mutex<Vec<AdEvent>>>,
}

impl InMemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding the ads of a parsed seed.
    pub fn from_seed(seed: Seed) -> Self {
        let repo = Self::new();
        for entry in seed.ads {
            let tenant = entry.tenant;
            repo.insert(tenant, entry.into());
        }
        repo
    }

    /// Loads a JSON seed file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Unavailable(format!("failed to read seed '{}': {e}", path.display()))
        })?;
        let seed: Seed = serde_json::from_str(&raw).map_err(|e| {
            StorageError::InvalidData(format!("invalid seed '{}': {e}", path.display()))
        })?;

        let count = seed.ads.len();
        let repo = Self::from_seed(seed);
        info!(path = %path.display(), ads = count, "Loaded in-memory seed");
        Ok(repo)
    }

    /// Inserts or replaces an ad, keyed by tenant and lowercase code.
    pub fn insert(&self, tenant: TenantId, mut stored: StoredAd) {
        stored.ad.code = AdCode::new(stored.ad.code.as_str().to_lowercase());
        let key = (tenant, stored.ad.code.clone());
        self.ads.insert(key, stored);
    }

    /// Soft-deletes an ad. Returns `false` when no live ad had that code.
    pub fn delete(&self, tenant: TenantId, code: &AdCode) -> bool {
        let key = (tenant, AdCode::new(code.as_str().to_lowercase()));
        match self.ads.get_mut(&key) {
            Some(mut entry) if !entry.deleted => {
                entry.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Returns a copy of every recorded event, oldest first.
    pub fn events(&self) -> Vec<AdEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AdRepository for InMemoryRepository {
    async fn active_ads(&self, tenant: TenantId, types: &[AdTypeId]) -> Result<Vec<Ad>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: HashSet<AdTypeId> = types.iter().copied().collect();
        let now = Timestamp::now();

        let mut ads: Vec<Ad> = self
            .ads
            .iter()
            .filter(|entry| entry.key().0 == tenant && entry.is_active_at(now))
            .filter_map(|entry| {
                let mut ad = entry.ad.clone();
                ad.variants.retain(|ad_type, _| wanted.contains(ad_type));
                (!ad.variants.is_empty()).then_some(ad)
            })
            .collect();
        ads.sort_by(|a, b| a.code.cmp(&b.code));

        debug!(tenant = %tenant, count = ads.len(), "Loaded active ads from memory");
        Ok(ads)
    }
}

#[async_trait]
impl ShortlinkRepository for InMemoryRepository {
    async fn resolve(&self, tenant: TenantId, code: &ShortCode) -> Result<Option<ShortlinkTarget>> {
        let key = (tenant, AdCode::new(code.as_str()));
        Ok(self
            .ads
            .get(&key)
            .filter(|entry| !entry.deleted)
            .map(|entry| ShortlinkTarget {
                url: entry.ad.target_url.clone(),
                ad_id: entry.ad.id.clone(),
            }))
    }
}

#[async_trait]
impl EventLog for InMemoryRepository {
    async fn record(&self, event: &AdEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
