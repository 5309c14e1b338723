use crate::resolver::{Resolution, ShortlinkResolver};
use billboard_cache::ShortlinkCache;
use billboard_core::{
    AdEvent, ClientIdentity, EventKind, EventLog, ShortCode, ShortlinkRepository, TenantId,
};
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, warn};

/// A followed shortlink.
#[derive(Debug, Clone)]
pub struct ClickRequest {
    pub tenant: TenantId,
    /// The code exactly as it appeared in the path.
    pub code: String,
    /// Host of the tenant's portal, used for the fallback redirect.
    pub portal: String,
    pub client: ClientIdentity,
    pub user_agent: String,
    pub referrer: String,
}

/// Where the client should be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// The shortlink's destination.
    Target(String),
    /// The tenant portal, flagged with `short_error=404`.
    Fallback(String),
}

impl Redirect {
    pub fn location(&self) -> &str {
        match self {
            Redirect::Target(url) | Redirect::Fallback(url) => url,
        }
    }
}

/// The redirect used when a code cannot be resolved.
pub fn fallback_url(portal: &str) -> String {
    format!("https://{portal}?short_error=404")
}

/// Resolves clicks and records them.
///
/// Invalid codes, misses and lookup errors all redirect to the tenant's
/// portal; only lookup errors are logged as warnings. A click is recorded
/// for every resolved code, and failing to record it does not change the
/// redirect.
pub struct RedirectService<R: ?Sized = dyn ShortlinkRepository, C: ?Sized = dyn ShortlinkCache> {
    resolver: ShortlinkResolver<R, C>,
    events: Arc<dyn EventLog>,
}

impl<R: ?Sized, C: ?Sized> Clone for RedirectService<R, C> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

impl<R, C> RedirectService<R, C>
where
    R: ShortlinkRepository + ?Sized,
    C: ShortlinkCache + ?Sized,
{
    pub fn new(resolver: ShortlinkResolver<R, C>, events: Arc<dyn EventLog>) -> Self {
        Self { resolver, events }
    }

    pub fn resolver(&self) -> &ShortlinkResolver<R, C> {
        &self.resolver
    }

    pub async fn redirect(&self, click: &ClickRequest) -> Redirect {
        let fallback = || Redirect::Fallback(fallback_url(&click.portal));

        let code = match ShortCode::new(&click.code) {
            Ok(code) => code,
            Err(e) => {
                debug!(tenant = %click.tenant, error = %e, "Rejected malformed shortlink");
                return fallback();
            }
        };

        let target = match self.resolver.resolve(click.tenant, &code).await {
            Ok(Resolution::Found(target)) => target,
            Ok(Resolution::NotFound) => return fallback(),
            Err(e) => {
                warn!(tenant = %click.tenant, code = %code, error = %e, "Shortlink lookup failed");
                return fallback();
            }
        };

        let event = AdEvent {
            ad_id: target.ad_id,
            tenant: click.tenant,
            kind: EventKind::Click,
            client: click.client.clone(),
            user_agent: click.user_agent.clone(),
            referrer: click.referrer.clone(),
            occurred_at: Timestamp::now(),
        };
        if let Err(e) = self.events.record(&event).await {
            warn!(tenant = %click.tenant, code = %code, error = %e, "Failed to record click");
        }

        Redirect::Target(target.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billboard_cache::{MokaShortlinkCache, ShortlinkTtl};
    use billboard_core::error::Result as StorageResult;
    use billboard_core::{Ad, AdCode, ShortlinkTarget, StorageError};
    use billboard_storage::{InMemoryRepository, StoredAd};
    use std::collections::BTreeMap;

    struct FailingEvents;

    #[async_trait]
    impl EventLog for FailingEvents {
        async fn record(&self, _event: &AdEvent) -> StorageResult<()> {
            Err(StorageError::Unavailable("mysql down".to_string()))
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl ShortlinkRepository for FailingRepository {
        async fn resolve(
            &self,
            _tenant: TenantId,
            _code: &ShortCode,
        ) -> StorageResult<Option<ShortlinkTarget>> {
            Err(StorageError::Timeout("pool timed out".to_string()))
        }
    }

    fn repo_with(code: &str, url: &str) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert(
            TenantId::new(1),
            StoredAd::active(Ad {
                code: AdCode::from(code),
                id: format!("uuid-{code}"),
                target_url: url.to_string(),
                breakpoint: 0,
                description: None,
                variants: BTreeMap::new(),
            }),
        );
        repo
    }

    fn click(code: &str) -> ClickRequest {
        ClickRequest {
            tenant: TenantId::new(1),
            code: code.to_string(),
            portal: "portal.example".to_string(),
            client: ClientIdentity {
                preferred_ip: "203.0.113.7".to_string(),
                raw_ip: "2001:db8::7".to_string(),
            },
            user_agent: "Mozilla/5.0".to_string(),
            referrer: "https://news.example/".to_string(),
        }
    }

    fn service(
        repo: InMemoryRepository,
        events: Arc<dyn EventLog>,
    ) -> RedirectService<InMemoryRepository, MokaShortlinkCache> {
        RedirectService::new(
            ShortlinkResolver::new(
                Arc::new(repo),
                Arc::new(MokaShortlinkCache::new(ShortlinkTtl::default())),
            ),
            events,
        )
    }

    #[tokio::test]
    async fn resolved_code_redirects_and_records_click() {
        let repo = repo_with("summer", "https://shop.example/summer");
        let service = service(repo.clone(), Arc::new(repo.clone()));

        let redirect = service.redirect(&click("SUMMER")).await;

        assert_eq!(
            redirect,
            Redirect::Target("https://shop.example/summer".to_string())
        );
        let events = repo.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Click);
        assert_eq!(events[0].ad_id, "uuid-summer");
        assert_eq!(events[0].client.raw_ip, "2001:db8::7");
    }

    #[tokio::test]
    async fn unknown_code_redirects_to_portal() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone(), Arc::new(repo.clone()));

        let redirect = service.redirect(&click("nope")).await;

        assert_eq!(
            redirect,
            Redirect::Fallback("https://portal.example?short_error=404".to_string())
        );
        assert!(repo.events().is_empty());
    }

    #[tokio::test]
    async fn malformed_code_redirects_to_portal() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone(), Arc::new(repo.clone()));

        let redirect = service.redirect(&click("../etc")).await;

        assert!(matches!(redirect, Redirect::Fallback(_)));
    }

    #[tokio::test]
    async fn click_log_failure_does_not_block_redirect() {
        let repo = repo_with("summer", "https://shop.example/summer");
        let service = service(repo, Arc::new(FailingEvents));

        let redirect = service.redirect(&click("summer")).await;

        assert_eq!(redirect.location(), "https://shop.example/summer");
    }

    #[tokio::test]
    async fn lookup_error_redirects_to_portal() {
        let service: RedirectService = RedirectService::new(
            ShortlinkResolver::new(
                Arc::new(FailingRepository) as Arc<dyn ShortlinkRepository>,
                Arc::new(MokaShortlinkCache::default()) as Arc<dyn ShortlinkCache>,
            ),
            Arc::new(FailingEvents),
        );

        let redirect = service.redirect(&click("summer")).await;

        assert_eq!(redirect.location(), "https://portal.example?short_error=404");
    }
}
