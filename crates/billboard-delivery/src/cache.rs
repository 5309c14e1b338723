use billboard_core::{Ad, TenantId};
use jiff::Timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The ads a tenant currently runs, as of `refreshed_at`.
#[derive(Debug, Clone)]
pub struct TenantSnapshot {
    pub ads: Arc<[Ad]>,
    pub refreshed_at: Option<Timestamp>,
}

impl TenantSnapshot {
    fn empty() -> Self {
        Self {
            ads: Arc::from(Vec::new()),
            refreshed_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }
}

/// Per-tenant snapshots of active ads.
///
/// Snapshots are replaced wholesale: `set` swaps the tenant's `Arc` under a
/// short write lock, so a reader holding the previous snapshot keeps seeing
/// it unchanged. Reads only clone an `Arc` and never wait on a refresh.
#[derive(Debug, Clone, Default)]
pub struct TenantAdCache {
    snapshots: Arc<RwLock<HashMap<TenantId, Arc<TenantSnapshot>>>>,
}

impl TenantAdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tenant's snapshot.
    pub fn set(&self, tenant: TenantId, ads: Vec<Ad>) {
        let snapshot = Arc::new(TenantSnapshot {
            ads: Arc::from(ads),
            refreshed_at: Some(Timestamp::now()),
        });
        let count = snapshot.ads.len();

        self.snapshots.write().insert(tenant, snapshot);
        debug!(tenant = %tenant, count, "Replaced tenant snapshot");
    }

    /// Returns the tenant's current snapshot, empty if none was ever set.
    pub fn get(&self, tenant: TenantId) -> Arc<TenantSnapshot> {
        self.snapshots
            .read()
            .get(&tenant)
            .cloned()
            .unwrap_or_else(|| Arc::new(TenantSnapshot::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billboard_core::{AdCode, AdTypeId, TypeVariant};
    use std::collections::BTreeMap;

    fn ad(code: &str) -> Ad {
        Ad {
            code: AdCode::from(code),
            id: format!("uuid-{code}"),
            target_url: "https://example.com".to_string(),
            breakpoint: 0,
            description: None,
            variants: BTreeMap::from([(
                AdTypeId::new(1),
                TypeVariant {
                    file: code.to_string(),
                    extension: "png".to_string(),
                },
            )]),
        }
    }

    #[test]
    fn unknown_tenant_is_empty() {
        let cache = TenantAdCache::new();
        let snapshot = cache.get(TenantId::new(1));
        assert!(snapshot.is_empty());
        assert!(snapshot.refreshed_at.is_none());
    }

    #[test]
    fn set_replaces_wholesale() {
        let cache = TenantAdCache::new();
        let tenant = TenantId::new(1);

        cache.set(tenant, vec![ad("a"), ad("b")]);
        cache.set(tenant, vec![ad("c")]);

        let snapshot = cache.get(tenant);
        let codes: Vec<&str> = snapshot.ads.iter().map(|ad| ad.code.as_str()).collect();
        assert_eq!(codes, vec!["c"]);
        assert!(snapshot.refreshed_at.is_some());
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let cache = TenantAdCache::new();
        let tenant = TenantId::new(1);

        cache.set(tenant, vec![ad("old")]);
        let held = cache.get(tenant);
        cache.set(tenant, vec![ad("new1"), ad("new2")]);

        assert_eq!(held.ads.len(), 1);
        assert_eq!(held.ads[0].code.as_str(), "old");
        assert_eq!(cache.get(tenant).ads.len(), 2);
    }

    #[test]
    fn tenants_are_isolated() {
        let cache = TenantAdCache::new();
        cache.set(TenantId::new(1), vec![ad("a")]);

        assert!(cache.get(TenantId::new(2)).is_empty());
        assert_eq!(cache.get(TenantId::new(1)).ads.len(), 1);
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let cache = TenantAdCache::new();
        let tenant = TenantId::new(1);
        cache.set(tenant, vec![ad("a")]);

        std::thread::scope(|scope| {
            let writer = cache.clone();
            scope.spawn(move || {
                for i in 0..200 {
                    let size = if i % 2 == 0 { 3 } else { 1 };
                    writer.set(tenant, (0..size).map(|n| ad(&format!("ad{n}"))).collect());
                }
            });

            for _ in 0..4 {
                let reader = cache.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let len = reader.get(tenant).ads.len();
                        assert!(len == 1 || len == 3);
                    }
                });
            }
        });
    }
}
