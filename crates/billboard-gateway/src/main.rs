use std::net::SocketAddr;
use std::sync::Arc;

use billboard_cache::{
    LayeredShortlinkCache, MokaRecencyStore, MokaShortlinkCache, RedisRecencyStore,
    RedisShortlinkCache, ShortlinkCache, ShortlinkTtl,
};
use billboard_core::{AdRepository, EventLog, RecencyStore, ShortlinkRepository};
use billboard_delivery::{CacheRefresher, DeliveryService, DeliverySettings, TenantAdCache};
use billboard_gateway::config::{Config, LogFormat, StorageBackendArg};
use billboard_gateway::error::StartupError;
use billboard_gateway::{App, AppState, TenantDirectory};
use billboard_redirector::{RedirectService, ShortlinkResolver};
use billboard_storage::{InMemoryRepository, MySqlRepository};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";
const RECENCY_MAX_WINDOWS: u64 = 100_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::try_parse()?;
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        redis = config.redis_url.is_some(),
        "starting billboard gateway"
    );

    let tenants = match &config.tenants_file {
        Some(path) => TenantDirectory::load(path)?,
        None => TenantDirectory::local(&config.listen_addr.to_string()),
    };
    let storage = Storage::open(&config).await?;
    let caches = Caches::open(&config).await?;

    let cache = TenantAdCache::new();
    let settings = DeliverySettings::builder()
        .recent_window(config.recent_window)
        .build();
    let delivery = DeliveryService::new(
        cache.clone(),
        Arc::clone(&storage.ads),
        caches.recency,
        Arc::clone(&storage.events),
        settings,
    );
    let redirect = RedirectService::new(
        ShortlinkResolver::new(Arc::clone(&storage.shortlinks), caches.shortlinks),
        Arc::clone(&storage.events),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = CacheRefresher::new(
        cache,
        Arc::clone(&storage.ads),
        tenants.tenant_ids(),
        delivery.catalog().to_vec(),
        config.refresh_interval(),
    );
    let refresher = refresher.start(shutdown_rx).await;

    let state = AppState::new(delivery, redirect, tenants);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "starting gateway server");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    refresher.await?;
    info!("gateway stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// One backend serving every repository role.
struct Storage {
    ads: Arc<dyn AdRepository>,
    shortlinks: Arc<dyn ShortlinkRepository>,
    events: Arc<dyn EventLog>,
}

impl Storage {
    async fn open(config: &Config) -> Result<Self, StartupError> {
        match config.storage {
            StorageBackendArg::InMemory => {
                let repository = match &config.seed_file {
                    Some(path) => InMemoryRepository::load(path)?,
                    None => {
                        warn!("in-memory storage without a seed file serves no ads");
                        InMemoryRepository::new()
                    }
                };
                Ok(Self::shared(repository))
            }
            StorageBackendArg::Mysql => {
                let dsn = config.mysql_dsn.as_deref().ok_or_else(|| {
                    StartupError::Config(
                        "mysql dsn is required when storage backend is mysql".to_string(),
                    )
                })?;
                Ok(Self::shared(MySqlRepository::connect(dsn).await?))
            }
        }
    }

    fn shared<T>(repository: T) -> Self
    where
        T: AdRepository + ShortlinkRepository + EventLog,
    {
        let repository = Arc::new(repository);
        Self {
            ads: repository.clone(),
            shortlinks: repository.clone(),
            events: repository,
        }
    }
}

/// Recency windows and shortlink tiers, shared through Redis when configured.
struct Caches {
    recency: Arc<dyn RecencyStore>,
    shortlinks: Arc<dyn ShortlinkCache>,
}

impl Caches {
    async fn open(config: &Config) -> Result<Self, StartupError> {
        let ttl = ShortlinkTtl::new(config.shortlink_ttl(), config.shortlink_missing_ttl());

        let Some(url) = config.redis_url.as_deref() else {
            return Ok(Self {
                recency: Arc::new(MokaRecencyStore::with_ttl(
                    RECENCY_MAX_WINDOWS,
                    config.recency_ttl(),
                )),
                shortlinks: Arc::new(MokaShortlinkCache::new(ttl)),
            });
        };

        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("connected to redis");

        Ok(Self {
            recency: Arc::new(RedisRecencyStore::with_ttl(
                conn.clone(),
                config.recency_ttl(),
            )),
            shortlinks: Arc::new(LayeredShortlinkCache::new(
                MokaShortlinkCache::new(ttl),
                RedisShortlinkCache::new(conn, ttl),
            )),
        })
    }
}
