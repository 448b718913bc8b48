//! `RedisService` against a live server. Ignored by default; run with
//! `TEST_REDIS_URL=redis://127.0.0.1:6379/15 cargo test --test redis_store -- --ignored`.
//! The target database is flushed.

use redis::AsyncCommands;

use axum_taskboard::errors::StoreError;
use axum_taskboard::models::User;
use axum_taskboard::services::{EntityStore, RedisService};

const EMAIL_INDEX_KEY: &str = "users:email";
const USERS_INDEX_KEY: &str = "users:index";

fn redis_url() -> String {
    std::env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string())
}

async fn fresh_store() -> (RedisService, redis::aio::MultiplexedConnection) {
    let url = redis_url();
    let client = redis::Client::open(url.as_str()).expect("Failed to create Redis client");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");
    redis::cmd("FLUSHDB")
        .query_async::<_, ()>(&mut conn)
        .await
        .expect("Failed to flush Redis");

    let store = RedisService::connect(&url).await.expect("Failed to connect store");
    (store, conn)
}

async fn email_owner(conn: &mut redis::aio::MultiplexedConnection, email: &str) -> Option<String> {
    conn.hget(EMAIL_INDEX_KEY, email).await.expect("Failed to read email index")
}

#[tokio::test]
#[ignore = "needs a running Redis"]
async fn failed_insert_hands_the_email_back() {
    let (store, mut conn) = fresh_store().await;
    // A string under the index key makes the ZADD in the write fail.
    let _: () = conn.set(USERS_INDEX_KEY, "not a zset").await.unwrap();

    let ada = User::new("Ada".into(), "ada@example.com".into());
    let err = store.insert_user(&ada).await.unwrap_err();
    assert!(matches!(err, StoreError::Redis(_)), "{err:?}");
    assert_eq!(email_owner(&mut conn, "ada@example.com").await, None);

    let _: () = conn.del(USERS_INDEX_KEY).await.unwrap();
    let retry = User::new("Ada".into(), "ada@example.com".into());
    store.insert_user(&retry).await.unwrap();
    assert_eq!(email_owner(&mut conn, "ada@example.com").await, Some(retry.id.clone()));
    assert_eq!(store.list_users().await.unwrap(), vec![retry]);
}

#[tokio::test]
#[ignore = "needs a running Redis"]
async fn duplicate_insert_keeps_the_existing_claim() {
    let (store, mut conn) = fresh_store().await;
    let ada = User::new("Ada".into(), "ada@example.com".into());
    store.insert_user(&ada).await.unwrap();

    let clash = User::new("Imposter".into(), "ada@example.com".into());
    assert!(matches!(
        store.insert_user(&clash).await,
        Err(StoreError::Duplicate("email"))
    ));
    assert_eq!(email_owner(&mut conn, "ada@example.com").await, Some(ada.id.clone()));
    assert_eq!(store.get_user(&clash.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "needs a running Redis"]
async fn email_change_moves_the_claim() {
    let (store, mut conn) = fresh_store().await;
    let mut ada = User::new("Ada".into(), "ada@example.com".into());
    store.insert_user(&ada).await.unwrap();

    ada.email = "lovelace@example.com".into();
    store.save_user(&ada).await.unwrap();

    assert_eq!(email_owner(&mut conn, "ada@example.com").await, None);
    assert_eq!(email_owner(&mut conn, "lovelace@example.com").await, Some(ada.id.clone()));
}
