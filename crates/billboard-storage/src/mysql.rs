use async_trait::async_trait;
use billboard_core::error::{Result, StorageError};
use billboard_core::{
    Ad, AdCode, AdEvent, AdRepository, AdTypeId, EventLog, ShortCode, ShortlinkRepository,
    ShortlinkTarget, TenantId, TypeVariant,
};
use jiff::Timestamp;
use serde::Deserialize;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// MySQL implementation of the ad, shortlink and event-log contracts.
///
/// Ads live in `ads`; a row is active when `status = 1`, `deleted_at IS NULL`
/// and the current time falls inside `[started_at, validate_at)` (either
/// bound may be NULL). Timestamps are unix seconds. Shortlinks are the ads'
/// own codes, so soft-deleted ads stop resolving but disabled ones do not.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

/// Per-type asset as stored in the `types` JSON object.
#[derive(Debug, Deserialize)]
struct StoredVariant {
    #[serde(default)]
    file: String,
    #[serde(default)]
    extension: String,
}

/// Parses the `types` column: `{"3": {"file": "...", "extension": "png"}}`.
///
/// Keys that are not type ids are ignored. Anything other than an object of
/// that shape is an error, which makes the caller skip the row.
fn parse_variants(raw: &str) -> std::result::Result<BTreeMap<AdTypeId, TypeVariant>, String> {
    let parsed: HashMap<String, StoredVariant> =
        serde_json::from_str(raw).map_err(|e| e.to_string())?;

    Ok(parsed
        .into_iter()
        .filter_map(|(key, variant)| {
            let id = key.trim().parse::<u32>().ok()?;
            Some((
                AdTypeId::new(id),
                TypeVariant {
                    file: variant.file.trim().to_string(),
                    extension: variant.extension.trim().to_string(),
                },
            ))
        })
        .collect())
}

/// Builds an [`Ad`] from an active row, keeping only the wanted types.
///
/// Returns `Ok(None)` for rows that should be skipped: missing or malformed
/// type descriptors, or none of the wanted types offered.
fn ad_from_row(
    tenant: TenantId,
    row: &MySqlRow,
    wanted: &HashSet<AdTypeId>,
) -> Result<Option<Ad>> {
    let id: String = row.try_get("uuid").map_err(map_sqlx_error)?;
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let types: Option<String> = row.try_get("types").map_err(map_sqlx_error)?;

    let Some(types) = types.filter(|raw| !raw.trim().is_empty()) else {
        debug!(tenant = %tenant, ad = %id, "Skipping ad without type descriptor");
        return Ok(None);
    };

    let mut variants = match parse_variants(&types) {
        Ok(variants) => variants,
        Err(e) => {
            warn!(tenant = %tenant, ad = %id, error = %e, "Skipping ad with malformed types");
            return Ok(None);
        }
    };
    variants.retain(|ad_type, _| wanted.contains(ad_type));
    if variants.is_empty() {
        return Ok(None);
    }

    Ok(Some(Ad {
        code: AdCode::new(code.to_lowercase()),
        id,
        target_url: row.try_get("redirect").map_err(map_sqlx_error)?,
        breakpoint: row.try_get("breakpoint").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        variants,
    }))
}

#[async_trait]
impl AdRepository for MySqlRepository {
    async fn active_ads(&self, tenant: TenantId, types: &[AdTypeId]) -> Result<Vec<Ad>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: HashSet<AdTypeId> = types.iter().copied().collect();
        let now = now_unix_seconds();

        let rows = sqlx::query(
            r#"
            SELECT uuid, code, redirect, description, breakpoint,
                   CAST(types AS CHAR) AS types
            FROM ads
            WHERE tenant_id = ?
              AND status = 1
              AND deleted_at IS NULL
              AND (started_at IS NULL OR started_at <= ?)
              AND (validate_at IS NULL OR validate_at > ?)
            "#,
        )
        .bind(tenant.get())
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let scanned = rows.len();
        let mut ads = Vec::with_capacity(scanned);
        for row in &rows {
            if let Some(ad) = ad_from_row(tenant, row, &wanted)? {
                ads.push(ad);
            }
        }

        debug!(tenant = %tenant, scanned, kept = ads.len(), "Loaded active ads from MySQL");
        Ok(ads)
    }
}

#[async_trait]
impl ShortlinkRepository for MySqlRepository {
    async fn resolve(&self, tenant: TenantId, code: &ShortCode) -> Result<Option<ShortlinkTarget>> {
        let row = sqlx::query(
            r#"
            SELECT redirect, uuid
            FROM ads
            WHERE tenant_id = ?
              AND code = ?
              AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(tenant.get())
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ShortlinkTarget {
            url: row.try_get("redirect").map_err(map_sqlx_error)?,
            ad_id: row.try_get("uuid").map_err(map_sqlx_error)?,
        }))
    }
}

#[async_trait]
impl EventLog for MySqlRepository {
    async fn record(&self, event: &AdEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ads_logs (uuid, tenant_id, type, ip, ip_raw, user_agent, referer, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.ad_id)
        .bind(event.tenant.get())
        .bind(event.kind.code())
        .bind(&event.client.preferred_ip)
        .bind(&event.client.raw_ip)
        .bind(&event.user_agent)
        .bind(&event.referrer)
        .bind(event.occurred_at.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
