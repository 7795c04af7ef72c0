//! Redis-backed application store.
//!
//! Layout per contest:
//! - `contest:{id}:application:{uid}` → JSON record
//! - `contest:{id}:applications:pending` (ZSET, score = request time ms)
//! - `contest:{id}:applications:accepted` / `:rejected` (SET)
//!
//! plus the shared reverse index `user:{uid}:applications` (SET of contest ids).
//! Conditional expiry (`EXPIRE ... NX|GT`) needs Redis 7 or later.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ApplicationStatus;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Pipeline};
use tracing::{debug, warn};

use super::{ApplicationStore, ContestApplication, StoreError, keys, ttl_secs};

#[derive(Clone)]
pub struct RedisApplicationStore {
    conn_manager: ConnectionManager,
}

impl RedisApplicationStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Cache(format!("Failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            StoreError::Cache(format!("Failed to create Redis connection manager: {e}"))
        })?;
        Ok(Self { conn_manager })
    }

    async fn load(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<Option<ContestApplication>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn.get(keys::application(contest_id, user_id)).await?;
        raw.as_deref().map(ContestApplication::from_json).transpose()
    }

    /// Loads many records in one round-trip. Missing or unreadable records are skipped.
    async fn load_many(&self, record_keys: &[String]) -> Result<Vec<ContestApplication>, StoreError> {
        if record_keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn_manager.clone();
        let raws: Vec<Option<String>> = redis::cmd("MGET")
            .arg(record_keys)
            .query_async(&mut conn)
            .await?;

        Ok(record_keys
            .iter()
            .zip(raws)
            .filter_map(|(key, raw)| {
                let raw = raw?;
                match ContestApplication::from_json(&raw) {
                    Ok(app) => Some(app),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Skipping unreadable application record");
                        None
                    }
                }
            })
            .collect())
    }

    /// Every user with an entry in any of the contest's indices.
    async fn indexed_users(&self, contest_id: i32) -> Result<BTreeSet<i32>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let (pending, accepted, rejected): (Vec<i32>, Vec<i32>, Vec<i32>) = redis::pipe()
            .zrange(keys::pending_index(contest_id), 0, -1)
            .smembers(keys::accepted_index(contest_id))
            .smembers(keys::rejected_index(contest_id))
            .query_async(&mut conn)
            .await?;
        Ok(pending.into_iter().chain(accepted).chain(rejected).collect())
    }

    async fn decide(
        &self,
        contest_id: i32,
        user_id: i32,
        status: ApplicationStatus,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError> {
        let mut app = self
            .load(contest_id, user_id)
            .await?
            .ok_or(StoreError::ApplicationNotFound)?;
        app.decide(status, processed_by, at)?;

        let target_index = match status {
            ApplicationStatus::Accepted => keys::accepted_index(contest_id),
            _ => keys::rejected_index(contest_id),
        };
        let drop_from_user_index = status == ApplicationStatus::Rejected;

        let mut conn = self.conn_manager.clone();
        let written: i32 = redis::Script::new(DECIDE_SCRIPT)
            .key(keys::application(contest_id, user_id))
            .key(keys::pending_index(contest_id))
            .key(&target_index)
            .key(keys::user_applications(user_id))
            .arg(app.to_json()?)
            .arg(user_id)
            .arg(contest_id)
            .arg(i32::from(drop_from_user_index))
            .invoke_async(&mut conn)
            .await?;
        // The record expired or was removed after it was read.
        if written == 0 {
            return Err(StoreError::ApplicationNotFound);
        }

        debug!(contest_id, user_id, status = %status, "Application decided");
        Ok(app)
    }
}

/// Rewrites a decided record in place and moves the user between indices.
///
/// KEYS: record, pending index, target index, user index.
/// ARGV: record JSON, user id, contest id, 1 to drop the contest from the
/// user index. Returns 0 without touching anything when the record is gone.
const DECIDE_SCRIPT: &str = r#"
if not redis.call('SET', KEYS[1], ARGV[1], 'XX', 'KEEPTTL') then
    return 0
end
redis.call('ZREM', KEYS[2], ARGV[2])
redis.call('SADD', KEYS[3], ARGV[2])
local remaining = redis.call('TTL', KEYS[1])
if remaining > 0 then
    redis.call('EXPIRE', KEYS[3], remaining, 'NX')
    redis.call('EXPIRE', KEYS[3], remaining, 'GT')
end
if ARGV[4] == '1' then
    redis.call('SREM', KEYS[4], ARGV[3])
end
return 1
"#;

/// Queues `EXPIRE key secs NX` followed by `EXPIRE key secs GT`: sets an expiry
/// on a key without one, otherwise only ever lengthens it.
fn extend_only(pipe: &mut Pipeline, key: &str, secs: i64) {
    pipe.cmd("EXPIRE").arg(key).arg(secs).arg("NX").ignore();
    pipe.cmd("EXPIRE").arg(key).arg(secs).arg("GT").ignore();
}

#[async_trait]
impl ApplicationStore for RedisApplicationStore {
    async fn request_participate(
        &self,
        application: &ContestApplication,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let contest_id = application.contest_id;
        let user_id = application.user_id;

        match self.load(contest_id, user_id).await {
            Ok(Some(existing)) if existing.status.blocks_reapplication() => {
                return Err(StoreError::DuplicateApplication);
            }
            Ok(_) => {}
            Err(StoreError::Serialization(e)) => {
                warn!(contest_id, user_id, error = %e, "Overwriting unreadable application record");
            }
            Err(e) => return Err(e),
        }

        let secs = ttl_secs(ttl);
        let pending_key = keys::pending_index(contest_id);
        let user_key = keys::user_applications(user_id);
        let score = application.requested_at.timestamp_millis();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(keys::application(contest_id, user_id))
            .arg(application.to_json()?)
            .arg("EX")
            .arg(secs)
            .ignore()
            .zadd(&pending_key, user_id, score)
            .ignore()
            .expire(&pending_key, secs)
            .ignore()
            .srem(keys::rejected_index(contest_id), user_id)
            .ignore()
            .sadd(&user_key, contest_id)
            .ignore();
        extend_only(&mut pipe, &user_key, secs);

        let mut conn = self.conn_manager.clone();
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(contest_id, user_id, ttl_secs = secs, "Application stored");
        Ok(())
    }

    async fn accept_request(
        &self,
        contest_id: i32,
        user_id: i32,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError> {
        self.decide(contest_id, user_id, ApplicationStatus::Accepted, processed_by, at)
            .await
    }

    async fn reject_request(
        &self,
        contest_id: i32,
        user_id: i32,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError> {
        self.decide(contest_id, user_id, ApplicationStatus::Rejected, processed_by, at)
            .await
    }

    async fn cancel_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<ContestApplication, StoreError> {
        let app = self
            .load(contest_id, user_id)
            .await?
            .ok_or(StoreError::ApplicationNotFound)?;
        if app.status != ApplicationStatus::Pending {
            return Err(StoreError::NotPending(app.status));
        }

        let mut conn = self.conn_manager.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(keys::application(contest_id, user_id))
            .ignore()
            .zrem(keys::pending_index(contest_id), user_id)
            .ignore()
            .srem(keys::accepted_index(contest_id), user_id)
            .ignore()
            .srem(keys::rejected_index(contest_id), user_id)
            .ignore()
            .srem(keys::user_applications(user_id), contest_id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!(contest_id, user_id, "Application cancelled");
        Ok(app)
    }

    async fn remove_application(&self, contest_id: i32, user_id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn_manager.clone();
        let (deleted,): (usize,) = redis::pipe()
            .atomic()
            .del(keys::application(contest_id, user_id))
            .zrem(keys::pending_index(contest_id), user_id)
            .ignore()
            .srem(keys::accepted_index(contest_id), user_id)
            .ignore()
            .srem(keys::rejected_index(contest_id), user_id)
            .ignore()
            .srem(keys::user_applications(user_id), contest_id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!(contest_id, user_id, deleted, "Application removed");
        Ok(deleted > 0)
    }

    async fn get_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<Option<ContestApplication>, StoreError> {
        self.load(contest_id, user_id).await
    }

    async fn get_pending_applications(
        &self,
        contest_id: i32,
    ) -> Result<Vec<ContestApplication>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let user_ids: Vec<i32> = conn.zrange(keys::pending_index(contest_id), 0, -1).await?;
        let record_keys: Vec<String> = user_ids
            .iter()
            .map(|&uid| keys::application(contest_id, uid))
            .collect();

        let apps = self.load_many(&record_keys).await?;
        Ok(apps
            .into_iter()
            .filter(|app| app.status == ApplicationStatus::Pending)
            .collect())
    }

    async fn get_accepted_applicants(&self, contest_id: i32) -> Result<Vec<i32>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let mut user_ids: Vec<i32> = conn.smembers(keys::accepted_index(contest_id)).await?;
        user_ids.sort_unstable();
        Ok(user_ids)
    }

    async fn get_user_applications(
        &self,
        user_id: i32,
    ) -> Result<Vec<ContestApplication>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let contest_ids: Vec<i32> = conn.smembers(keys::user_applications(user_id)).await?;
        let record_keys: Vec<String> = contest_ids
            .iter()
            .map(|&cid| keys::application(cid, user_id))
            .collect();

        let mut apps = self.load_many(&record_keys).await?;
        apps.sort_by_key(|app| (app.requested_at, app.contest_id));
        Ok(apps)
    }

    async fn has_applied(&self, contest_id: i32, user_id: i32) -> Result<bool, StoreError> {
        Ok(self
            .load(contest_id, user_id)
            .await?
            .is_some_and(|app| app.status.blocks_reapplication()))
    }

    async fn extend_ttl(&self, contest_id: i32, ttl: Duration) -> Result<usize, StoreError> {
        let users = self.indexed_users(contest_id).await?;
        let secs = ttl_secs(ttl);

        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys::contest_indices(contest_id) {
            pipe.expire(key, secs);
        }
        for &uid in &users {
            pipe.expire(keys::application(contest_id, uid), secs);
        }
        for &uid in &users {
            extend_only(&mut pipe, &keys::user_applications(uid), secs);
        }

        let mut conn = self.conn_manager.clone();
        let touched: Vec<bool> = pipe.query_async(&mut conn).await?;
        let count = touched.into_iter().filter(|&t| t).count();

        debug!(contest_id, count, ttl_secs = secs, "Application TTL re-anchored");
        Ok(count)
    }

    async fn clear_applications(&self, contest_id: i32) -> Result<usize, StoreError> {
        let users = self.indexed_users(contest_id).await?;

        let mut contest_keys: Vec<String> = users
            .iter()
            .map(|&uid| keys::application(contest_id, uid))
            .collect();
        contest_keys.extend(keys::contest_indices(contest_id));

        let mut pipe = redis::pipe();
        pipe.atomic().del(&contest_keys);
        for &uid in &users {
            pipe.srem(keys::user_applications(uid), contest_id).ignore();
        }

        let mut conn = self.conn_manager.clone();
        let (removed,): (usize,) = pipe.query_async(&mut conn).await?;

        debug!(contest_id, removed, "Application cache cleared");
        Ok(removed)
    }
}
