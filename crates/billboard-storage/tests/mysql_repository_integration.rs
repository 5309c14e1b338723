use billboard_core::{
    AdCode, AdEvent, AdRepository, AdTypeId, ClientIdentity, EventKind, EventLog, ShortCode,
    ShortlinkRepository, TenantId,
};
use billboard_storage::MySqlRepository;
use billboard_test_infra::mysql::{MySqlServer, MysqlConfig};
use jiff::{SignedDuration, Timestamp};
use sqlx::Row;

struct Fixture {
    _mysql: MySqlServer,
    repo: MySqlRepository,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let pool = mysql.pool().await.expect("connect mysql");

        for ddl in [
            include_str!("../ddl/mysql/ads.sql"),
            include_str!("../ddl/mysql/ads_logs.sql"),
        ] {
            sqlx::query(ddl).execute(&pool).await.expect("create schema");
        }

        Self {
            _mysql: mysql,
            repo: MySqlRepository::new(pool),
        }
    }

    async fn insert_ad(&self, row: AdRow<'_>) {
        sqlx::query(
            r#"
            INSERT INTO ads (uuid, tenant_id, code, redirect, description, breakpoint,
                             types, status, started_at, validate_at, deleted_at)
            VALUES (?, ?, ?, ?, NULL, 0, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.uuid)
        .bind(row.tenant)
        .bind(row.code)
        .bind(format!("https://{}.example", row.code))
        .bind(row.types)
        .bind(row.status)
        .bind(row.started_at)
        .bind(row.validate_at)
        .bind(row.deleted_at)
        .execute(self.repo.pool())
        .await
        .expect("insert ad");
    }
}

struct AdRow<'a> {
    uuid: &'a str,
    tenant: u32,
    code: &'a str,
    types: Option<&'a str>,
    status: i8,
    started_at: Option<i64>,
    validate_at: Option<i64>,
    deleted_at: Option<i64>,
}

impl<'a> AdRow<'a> {
    fn live(uuid: &'a str, code: &'a str, types: &'a str) -> Self {
        Self {
            uuid,
            tenant: 1,
            code,
            types: Some(types),
            status: 1,
            started_at: None,
            validate_at: None,
            deleted_at: None,
        }
    }
}

fn types(ids: &[u32]) -> Vec<AdTypeId> {
    ids.iter().copied().map(AdTypeId::new).collect()
}

const BANNER: &str = r#"{"1": {"file": "f1", "extension": "png"}, "3": {"file": "f3", "extension": "jpg"}}"#;

#[tokio::test]
async fn active_ads_applies_lifecycle_and_types() {
    let fixture = Fixture::start().await;
    let now = Timestamp::now().as_second();

    fixture.insert_ad(AdRow::live("u-live", "live", BANNER)).await;
    fixture
        .insert_ad(AdRow {
            status: 0,
            ..AdRow::live("u-off", "off", BANNER)
        })
        .await;
    fixture
        .insert_ad(AdRow {
            deleted_at: Some(now),
            ..AdRow::live("u-del", "del", BANNER)
        })
        .await;
    fixture
        .insert_ad(AdRow {
            started_at: Some(now + 3600),
            ..AdRow::live("u-soon", "soon", BANNER)
        })
        .await;
    fixture
        .insert_ad(AdRow {
            validate_at: Some(now - 1),
            ..AdRow::live("u-old", "old", BANNER)
        })
        .await;
    fixture
        .insert_ad(AdRow {
            tenant: 2,
            ..AdRow::live("u-other", "other", BANNER)
        })
        .await;

    let ads = fixture
        .repo
        .active_ads(TenantId::new(1), &types(&[3, 4]))
        .await
        .unwrap();

    assert_eq!(ads.len(), 1);
    let ad = &ads[0];
    assert_eq!(ad.code, AdCode::from("live"));
    assert_eq!(ad.id, "u-live");
    assert_eq!(ad.target_url, "https://live.example");
    let offered: Vec<AdTypeId> = ad.type_ids().collect();
    assert_eq!(offered, types(&[3]));
    assert_eq!(ad.variant(AdTypeId::new(3)).unwrap().extension, "jpg");
}

#[tokio::test]
async fn active_ads_skips_malformed_type_descriptors() {
    let fixture = Fixture::start().await;

    fixture.insert_ad(AdRow::live("u-good", "good", BANNER)).await;
    fixture
        .insert_ad(AdRow::live("u-array", "legacy", "[1, 3]"))
        .await;
    fixture
        .insert_ad(AdRow {
            types: None,
            ..AdRow::live("u-none", "none", BANNER)
        })
        .await;

    let ads = fixture
        .repo
        .active_ads(TenantId::new(1), &types(&[1]))
        .await
        .unwrap();

    let codes: Vec<&str> = ads.iter().map(|ad| ad.code.as_str()).collect();
    assert_eq!(codes, vec!["good"]);
}

#[tokio::test]
async fn resolve_excludes_soft_deleted_rows() {
    let fixture = Fixture::start().await;
    let now = Timestamp::now().as_second();

    fixture.insert_ad(AdRow::live("u-a", "promo", BANNER)).await;
    fixture
        .insert_ad(AdRow {
            deleted_at: Some(now),
            ..AdRow::live("u-b", "retired", BANNER)
        })
        .await;

    let found = fixture
        .repo
        .resolve(TenantId::new(1), &ShortCode::new("PROMO").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.url, "https://promo.example");
    assert_eq!(found.ad_id, "u-a");

    let retired = fixture
        .repo
        .resolve(TenantId::new(1), &ShortCode::new("retired").unwrap())
        .await
        .unwrap();
    assert!(retired.is_none());

    let other_tenant = fixture
        .repo
        .resolve(TenantId::new(2), &ShortCode::new("promo").unwrap())
        .await
        .unwrap();
    assert!(other_tenant.is_none());
}

#[tokio::test]
async fn record_inserts_event_row() {
    let fixture = Fixture::start().await;
    let occurred_at = Timestamp::now() - SignedDuration::from_secs(5);

    fixture
        .repo
        .record(&AdEvent {
            ad_id: "u-a".to_string(),
            tenant: TenantId::new(9),
            kind: EventKind::Click,
            client: ClientIdentity {
                preferred_ip: "203.0.113.7".to_string(),
                raw_ip: "2001:db8::7".to_string(),
            },
            user_agent: "Mozilla/5.0".to_string(),
            referrer: "https://news.example/".to_string(),
            occurred_at,
        })
        .await
        .unwrap();

    let row = sqlx::query(
        "SELECT uuid, tenant_id, type, ip, ip_raw, user_agent, referer, created_at FROM ads_logs",
    )
    .fetch_one(fixture.repo.pool())
    .await
    .unwrap();

    assert_eq!(row.get::<String, _>("uuid"), "u-a");
    assert_eq!(row.get::<u32, _>("tenant_id"), 9);
    assert_eq!(row.get::<i8, _>("type"), 2);
    assert_eq!(row.get::<String, _>("ip"), "203.0.113.7");
    assert_eq!(row.get::<Option<String>, _>("ip_raw").as_deref(), Some("2001:db8::7"));
    assert_eq!(row.get::<String, _>("referer"), "https://news.example/");
    assert_eq!(row.get::<i64, _>("created_at"), occurred_at.as_second());
}
