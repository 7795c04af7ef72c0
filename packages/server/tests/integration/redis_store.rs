//! Redis adapter against a real server started through testcontainers.

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use chrono::Utc;
use common::ApplicationStatus;
use contest_server::store::{
    ApplicationStore, ContestApplication, RedisApplicationStore, StoreError, keys,
};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::{REDIS_PORT, Redis};
use tokio::sync::OnceCell;

/// Redis container shared across the tests in this module.
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Contest IDs are unique per test so tests can share one keyspace.
static NEXT_CONTEST: AtomicI32 = AtomicI32::new(10_000);

async fn redis_url() -> &'static str {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            // EXPIRE NX/GT needs Redis 7.
            let container = Redis::default()
                .with_tag("7.2-alpine")
                .start()
                .await
                .expect("Failed to start Redis container");
            let port = container
                .get_host_port_ipv4(REDIS_PORT)
                .await
                .expect("Failed to get Redis port");
            (container, format!("redis://127.0.0.1:{port}"))
        })
        .await;
    url
}

async fn setup() -> (RedisApplicationStore, ConnectionManager) {
    let url = redis_url().await;
    let store = RedisApplicationStore::connect(url)
        .await
        .expect("Failed to connect store");
    let client = redis::Client::open(url).unwrap();
    let raw = ConnectionManager::new(client).await.unwrap();
    (store, raw)
}

fn next_contest() -> i32 {
    NEXT_CONTEST.fetch_add(1, Ordering::Relaxed)
}

fn pending(contest_id: i32, user_id: i32) -> ContestApplication {
    ContestApplication::pending(contest_id, user_id, Utc::now(), None)
}

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn request_accept_and_duplicates() {
    let (store, _) = setup().await;
    let contest = next_contest();
    let user = contest * 10;

    store
        .request_participate(&pending(contest, user), HOUR)
        .await
        .unwrap();
    let err = store
        .request_participate(&pending(contest, user), HOUR)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateApplication));

    let accepted = store
        .accept_request(contest, user, 1, Utc::now())
        .await
        .unwrap();
    assert_eq!(accepted.status, ApplicationStatus::Accepted);
    assert_eq!(store.get_accepted_applicants(contest).await.unwrap(), vec![user]);
    assert!(store.get_pending_applications(contest).await.unwrap().is_empty());
    assert!(store.has_applied(contest, user).await.unwrap());

    let err = store
        .accept_request(contest, user, 1, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotPending(ApplicationStatus::Accepted)
    ));

    let mine = store.get_user_applications(user).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].contest_id, contest);
}

#[tokio::test]
async fn reject_then_reapply_and_remove() {
    let (store, mut raw) = setup().await;
    let contest = next_contest();
    let user = contest * 10;

    store
        .request_participate(&pending(contest, user), HOUR)
        .await
        .unwrap();
    store
        .reject_request(contest, user, 1, Utc::now())
        .await
        .unwrap();
    assert!(!store.has_applied(contest, user).await.unwrap());
    assert!(store.get_user_applications(user).await.unwrap().is_empty());

    store
        .request_participate(&pending(contest, user), HOUR)
        .await
        .unwrap();
    let is_rejected: bool = raw
        .sismember(keys::rejected_index(contest), user)
        .await
        .unwrap();
    assert!(!is_rejected);

    assert!(store.remove_application(contest, user).await.unwrap());
    assert!(!store.remove_application(contest, user).await.unwrap());
    assert!(store.get_application(contest, user).await.unwrap().is_none());
    assert!(store.get_pending_applications(contest).await.unwrap().is_empty());
}

#[tokio::test]
async fn extend_ttl_never_shortens_shared_user_index() {
    let (store, mut raw) = setup().await;
    let short = next_contest();
    let long = next_contest();
    let user = short * 10;

    store
        .request_participate(&pending(short, user), Duration::from_secs(100))
        .await
        .unwrap();
    store
        .request_participate(&pending(long, user), Duration::from_secs(5000))
        .await
        .unwrap();

    let touched = store
        .extend_ttl(short, Duration::from_secs(200))
        .await
        .unwrap();
    assert_eq!(touched, 2, "record and pending index");

    let record_ttl: i64 = raw.ttl(keys::application(short, user)).await.unwrap();
    assert!((150..=200).contains(&record_ttl), "record ttl {record_ttl}");

    let user_ttl: i64 = raw.ttl(keys::user_applications(user)).await.unwrap();
    assert!(user_ttl > 4000, "user index ttl shrank to {user_ttl}");
}

#[tokio::test]
async fn clear_leaves_other_contests_alone() {
    let (store, mut raw) = setup().await;
    let target = next_contest();
    let other = next_contest();
    let shared_user = target * 10;

    for user in [shared_user, shared_user + 1, shared_user + 2] {
        store
            .request_participate(&pending(target, user), HOUR)
            .await
            .unwrap();
    }
    store
        .accept_request(target, shared_user + 1, 1, Utc::now())
        .await
        .unwrap();
    store
        .request_participate(&pending(other, shared_user), HOUR)
        .await
        .unwrap();

    let removed = store.clear_applications(target).await.unwrap();
    // 3 records, the pending index and the accepted index.
    assert_eq!(removed, 5);

    for key in keys::contest_indices(target) {
        let exists: bool = raw.exists(&key).await.unwrap();
        assert!(!exists, "{key} survived");
    }
    let mine = store.get_user_applications(shared_user).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].contest_id, other);
    assert_eq!(store.get_pending_applications(other).await.unwrap().len(), 1);

    assert_eq!(store.clear_applications(target).await.unwrap(), 0);
}

#[tokio::test]
async fn decide_keeps_record_ttl_and_ignores_vanished_records() {
    let (store, mut raw) = setup().await;
    let contest = next_contest();
    let user = contest * 10;
    let gone = user + 1;

    for uid in [user, gone] {
        store
            .request_participate(&pending(contest, uid), Duration::from_secs(600))
            .await
            .unwrap();
    }

    store
        .accept_request(contest, user, 1, Utc::now())
        .await
        .unwrap();
    let record_ttl: i64 = raw.ttl(keys::application(contest, user)).await.unwrap();
    assert!((500..=600).contains(&record_ttl), "record ttl {record_ttl}");
    let index_ttl: i64 = raw.ttl(keys::accepted_index(contest)).await.unwrap();
    assert!(index_ttl > 0, "accepted index has no expiry");

    let _: () = raw.del(keys::application(contest, gone)).await.unwrap();
    let err = store
        .reject_request(contest, gone, 1, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ApplicationNotFound));

    let exists: bool = raw.exists(keys::application(contest, gone)).await.unwrap();
    assert!(!exists, "a decision recreated a removed record");
    let is_rejected: bool = raw
        .sismember(keys::rejected_index(contest), gone)
        .await
        .unwrap();
    assert!(!is_rejected);
    assert_eq!(store.get_accepted_applicants(contest).await.unwrap(), vec![user]);
}
