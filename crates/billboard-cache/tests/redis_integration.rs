use billboard_cache::{
    LayeredShortlinkCache, MokaShortlinkCache, RedisRecencyStore, RedisShortlinkCache,
    ShortlinkCache, ShortlinkKey, ShortlinkTtl,
};
use billboard_core::{AdCode, RecencyStore, ShortCode, ShortlinkTarget, TenantId, UserKey};
use billboard_test_infra::redis::RedisServer;
use redis::AsyncCommands;
use std::time::Duration;

fn key(code: &str) -> ShortlinkKey {
    ShortlinkKey::new(TenantId::new(7), ShortCode::new_unchecked(code))
}

fn target(url: &str) -> ShortlinkTarget {
    ShortlinkTarget {
        url: url.to_string(),
        ad_id: "3f1c2b9e-0000-4000-8000-000000000001".to_string(),
    }
}

fn codes(values: &[&str]) -> Vec<AdCode> {
    values.iter().copied().map(AdCode::from).collect()
}

#[tokio::test]
async fn shortlink_positive_and_negative_tiers() {
    let redis = RedisServer::new().await.unwrap();
    let conn = redis.connection().await.unwrap();
    let cache = RedisShortlinkCache::new(conn, ShortlinkTtl::default());
    let k = key("promo");

    assert!(cache.get_target(&k).await.unwrap().is_none());
    assert!(!cache.is_missing(&k).await.unwrap());

    cache.mark_missing(&k).await.unwrap();
    assert!(cache.is_missing(&k).await.unwrap());

    cache.put_target(&k, &target("https://shop.example/promo")).await.unwrap();
    cache.clear_missing(&k).await.unwrap();

    assert!(!cache.is_missing(&k).await.unwrap());
    assert_eq!(
        cache.get_target(&k).await.unwrap(),
        Some(target("https://shop.example/promo"))
    );
}

#[tokio::test]
async fn shortlink_entries_carry_tier_ttls() {
    let redis = RedisServer::new().await.unwrap();
    let mut conn = redis.connection().await.unwrap();
    let ttl = ShortlinkTtl::new(Duration::from_secs(3600), Duration::from_secs(240));
    let cache = RedisShortlinkCache::with_prefix(conn.clone(), ttl, "t:");

    cache.put_target(&key("a"), &target("https://a.example")).await.unwrap();
    cache.mark_missing(&key("b")).await.unwrap();

    let found_ttl: i64 = conn.ttl("t:7:a").await.unwrap();
    let missing_ttl: i64 = conn.ttl("nf:t:7:b").await.unwrap();

    assert!(found_ttl > 240 && found_ttl <= 3600);
    assert!(missing_ttl > 0 && missing_ttl <= 240);
}

#[tokio::test]
async fn shortlink_rejects_corrupt_entries() {
    let redis = RedisServer::new().await.unwrap();
    let mut conn = redis.connection().await.unwrap();
    let cache = RedisShortlinkCache::with_prefix(conn.clone(), ShortlinkTtl::default(), "t:");

    conn.set::<_, _, ()>("t:7:bad", "not json").await.unwrap();

    assert!(cache.get_target(&key("bad")).await.is_err());
}

#[tokio::test]
async fn layered_backfills_moka_from_redis() {
    let redis = RedisServer::new().await.unwrap();
    let conn = redis.connection().await.unwrap();
    let cache = LayeredShortlinkCache::new(
        MokaShortlinkCache::default(),
        RedisShortlinkCache::new(conn, ShortlinkTtl::default()),
    );
    let k = key("shared");

    cache.l2().put_target(&k, &target("https://shared.example")).await.unwrap();

    assert!(cache.get_target(&k).await.unwrap().is_some());
    assert!(cache.l1().get_target(&k).await.unwrap().is_some());
}

#[tokio::test]
async fn layered_backfill_keeps_redis_remaining_lifetime() {
    let redis = RedisServer::new().await.unwrap();
    let mut conn = redis.connection().await.unwrap();
    let ttl = ShortlinkTtl::new(Duration::from_secs(3600), Duration::from_secs(240));
    let cache = LayeredShortlinkCache::new(
        MokaShortlinkCache::new(ttl),
        RedisShortlinkCache::with_prefix(conn.clone(), ttl, "t:"),
    );
    let k = key("gone");

    // Another node marked the code long ago; 5 seconds remain in Redis.
    let _: () = conn.set_ex("nf:t:7:gone", "1", 5).await.unwrap();

    assert!(cache.is_missing(&k).await.unwrap());
    let l1_left = cache.l1().missing_ttl(&k).await.unwrap().unwrap();
    assert!(l1_left <= Duration::from_secs(5));
}

#[tokio::test]
async fn recency_window_is_ordered_and_bounded() {
    let redis = RedisServer::new().await.unwrap();
    let conn = redis.connection().await.unwrap();
    let store = RedisRecencyStore::new(conn);
    let tenant = TenantId::new(1);
    let user = UserKey::fingerprint("203.0.113.9", "Mozilla/5.0");

    store.push(tenant, &user, &codes(&["a", "b"]), 3).await.unwrap();
    store.push(tenant, &user, &codes(&["c", "d"]), 3).await.unwrap();

    let window = store.recent(tenant, &user, 10).await.unwrap();
    assert_eq!(window, codes(&["c", "d", "a"]));

    let head = store.recent(tenant, &user, 1).await.unwrap();
    assert_eq!(head, codes(&["c"]));
}

#[tokio::test]
async fn recency_push_sets_expiry() {
    let redis = RedisServer::new().await.unwrap();
    let mut conn = redis.connection().await.unwrap();
    let store = RedisRecencyStore::with_ttl(conn.clone(), Duration::from_secs(120));
    let tenant = TenantId::new(4);
    let user = UserKey::new_unchecked("u1");

    store.push(tenant, &user, &codes(&["x"]), 5).await.unwrap();

    let ttl: i64 = conn.ttl("recent:4:u1").await.unwrap();
    assert!(ttl > 0 && ttl <= 120);
}

#[tokio::test]
async fn recency_zero_bound_is_noop() {
    let redis = RedisServer::new().await.unwrap();
    let conn = redis.connection().await.unwrap();
    let store = RedisRecencyStore::new(conn);
    let tenant = TenantId::new(1);
    let user = UserKey::new_unchecked("u1");

    store.push(tenant, &user, &codes(&["a"]), 0).await.unwrap();

    assert!(store.recent(tenant, &user, 5).await.unwrap().is_empty());
}
