//! In-process application store for single-node development and tests.
//!
//! Emulates the Redis layout key for key (records, per-contest indices, the
//! shared user index, and per-key expiry) so both adapters diverge and expire
//! the same way. Expiry is evaluated lazily against the injected clock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ApplicationStatus;

use tracing::warn;

use super::{ApplicationStore, ContestApplication, StoreError, keys};
use crate::clock::Clock;

#[derive(Debug, Clone)]
enum Value {
    Record(String),
    /// member → score
    SortedSet(BTreeMap<i32, i64>),
    Set(BTreeSet<i32>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
}

impl Keyspace {
    fn purge_if_expired(&mut self, key: &str, now: DateTime<Utc>) {
        let expired = self
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            self.entries.remove(key);
        }
    }

    fn live(&mut self, key: &str, now: DateTime<Utc>) -> Option<&mut Entry> {
        self.purge_if_expired(key, now);
        self.entries.get_mut(key)
    }

    fn record(&mut self, key: &str, now: DateTime<Utc>) -> Option<String> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Record(raw),
                ..
            }) => Some(raw.clone()),
            _ => None,
        }
    }

    fn set_record(&mut self, key: &str, raw: String, expires_at: Option<DateTime<Utc>>) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Record(raw),
                expires_at,
            },
        );
    }

    /// Overwrites a record, keeping its current expiry.
    fn set_record_keep_ttl(&mut self, key: &str, raw: String, now: DateTime<Utc>) {
        let expires_at = self.live(key, now).and_then(|e| e.expires_at);
        self.set_record(key, raw, expires_at);
    }

    fn expires_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.live(key, now).and_then(|e| e.expires_at)
    }

    fn zadd(&mut self, key: &str, member: i32, score: i64, now: DateTime<Utc>) {
        self.purge_if_expired(key, now);
        let entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::SortedSet(BTreeMap::new()),
            expires_at: None,
        });
        if let Value::SortedSet(members) = &mut entry.value {
            members.insert(member, score);
        }
    }

    fn sadd(&mut self, key: &str, member: i32, now: DateTime<Utc>) {
        self.purge_if_expired(key, now);
        let entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        if let Value::Set(members) = &mut entry.value {
            members.insert(member);
        }
    }

    /// Removes a member from a set or sorted set. Empty collections vanish.
    fn remove_member(&mut self, key: &str, member: i32, now: DateTime<Utc>) {
        let Some(entry) = self.live(key, now) else {
            return;
        };
        let empty = match &mut entry.value {
            Value::SortedSet(members) => {
                members.remove(&member);
                members.is_empty()
            }
            Value::Set(members) => {
                members.remove(&member);
                members.is_empty()
            }
            Value::Record(_) => false,
        };
        if empty {
            self.entries.remove(key);
        }
    }

    /// Members ordered by score, then member.
    fn sorted_members(&mut self, key: &str, now: DateTime<Utc>) -> Vec<i32> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::SortedSet(members),
                ..
            }) => {
                let mut by_score: Vec<(i64, i32)> =
                    members.iter().map(|(&m, &s)| (s, m)).collect();
                by_score.sort_unstable();
                by_score.into_iter().map(|(_, m)| m).collect()
            }
            _ => Vec::new(),
        }
    }

    fn set_members(&mut self, key: &str, now: DateTime<Utc>) -> Vec<i32> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => members.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    fn expire(&mut self, key: &str, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.live(key, now) {
            Some(entry) => {
                entry.expires_at = Some(at);
                true
            }
            None => false,
        }
    }

    /// Sets the expiry if the key has none, otherwise only lengthens it.
    fn extend_only(&mut self, key: &str, at: DateTime<Utc>, now: DateTime<Utc>) {
        if let Some(entry) = self.live(key, now) {
            match entry.expires_at {
                Some(current) if current >= at => {}
                _ => entry.expires_at = Some(at),
            }
        }
    }

    fn del(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        self.purge_if_expired(key, now);
        self.entries.remove(key).is_some()
    }
}

pub struct MemoryApplicationStore {
    keyspace: Mutex<Keyspace>,
    clock: Arc<dyn Clock>,
}

impl MemoryApplicationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            keyspace: Mutex::new(Keyspace::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Keyspace> {
        self.keyspace.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deadline(&self, ttl: Duration) -> DateTime<Utc> {
        let secs = super::ttl_secs(ttl);
        self.clock.now() + chrono::Duration::seconds(secs)
    }

    fn load(
        keyspace: &mut Keyspace,
        contest_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ContestApplication>, StoreError> {
        keyspace
            .record(&keys::application(contest_id, user_id), now)
            .as_deref()
            .map(ContestApplication::from_json)
            .transpose()
    }

    /// Like `load`, but an unreadable record is logged and treated as absent.
    fn load_or_skip(
        keyspace: &mut Keyspace,
        contest_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Option<ContestApplication> {
        match Self::load(keyspace, contest_id, user_id, now) {
            Ok(app) => app,
            Err(e) => {
                let key = keys::application(contest_id, user_id);
                warn!(key = %key, error = %e, "Skipping unreadable application record");
                None
            }
        }
    }

    fn indexed_users(keyspace: &mut Keyspace, contest_id: i32, now: DateTime<Utc>) -> BTreeSet<i32> {
        let mut users: BTreeSet<i32> = keyspace
            .sorted_members(&keys::pending_index(contest_id), now)
            .into_iter()
            .collect();
        users.extend(keyspace.set_members(&keys::accepted_index(contest_id), now));
        users.extend(keyspace.set_members(&keys::rejected_index(contest_id), now));
        users
    }

    fn decide(
        &self,
        contest_id: i32,
        user_id: i32,
        status: ApplicationStatus,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError> {
        let now = self.clock.now();
        let mut ks = self.lock();

        let mut app = Self::load(&mut ks, contest_id, user_id, now)?
            .ok_or(StoreError::ApplicationNotFound)?;
        app.decide(status, processed_by, at)?;

        let record_key = keys::application(contest_id, user_id);
        let record_expiry = ks.expires_at(&record_key, now);
        ks.set_record_keep_ttl(&record_key, app.to_json()?, now);
        ks.remove_member(&keys::pending_index(contest_id), user_id, now);

        let target_index = match status {
            ApplicationStatus::Accepted => keys::accepted_index(contest_id),
            _ => keys::rejected_index(contest_id),
        };
        ks.sadd(&target_index, user_id, now);
        if let Some(deadline) = record_expiry {
            ks.extend_only(&target_index, deadline, now);
        }
        if status == ApplicationStatus::Rejected {
            ks.remove_member(&keys::user_applications(user_id), contest_id, now);
        }
        Ok(app)
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn request_participate(
        &self,
        application: &ContestApplication,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let contest_id = application.contest_id;
        let user_id = application.user_id;
        let now = self.clock.now();
        let expires_at = self.deadline(ttl);
        let raw = application.to_json()?;

        let mut ks = self.lock();
        match Self::load(&mut ks, contest_id, user_id, now) {
            Ok(Some(existing)) if existing.status.blocks_reapplication() => {
                return Err(StoreError::DuplicateApplication);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(contest_id, user_id, error = %e, "Overwriting unreadable application record");
            }
        }

        ks.set_record(&keys::application(contest_id, user_id), raw, Some(expires_at));

        let pending_key = keys::pending_index(contest_id);
        ks.zadd(
            &pending_key,
            user_id,
            application.requested_at.timestamp_millis(),
            now,
        );
        ks.expire(&pending_key, expires_at, now);
        ks.remove_member(&keys::rejected_index(contest_id), user_id, now);

        let user_key = keys::user_applications(user_id);
        ks.sadd(&user_key, contest_id, now);
        ks.extend_only(&user_key, expires_at, now);
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
    }

    async fn reject_request(
        &self,
        contest_id: i32,
        user_id: i32,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError> {
        self.decide(contest_id, user_id, ApplicationStatus::Rejected, processed_by, at)
    }

    async fn cancel_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<ContestApplication, StoreError> {
        let now = self.clock.now();
        let mut ks = self.lock();

        let app = Self::load(&mut ks, contest_id, user_id, now)?
            .ok_or(StoreError::ApplicationNotFound)?;
        if app.status != ApplicationStatus::Pending {
            return Err(StoreError::NotPending(app.status));
        }

        ks.del(&keys::application(contest_id, user_id), now);
        for index in keys::contest_indices(contest_id) {
            ks.remove_member(&index, user_id, now);
        }
        ks.remove_member(&keys::user_applications(user_id), contest_id, now);
        Ok(app)
    }

    async fn remove_application(&self, contest_id: i32, user_id: i32) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut ks = self.lock();

        let existed = ks.del(&keys::application(contest_id, user_id), now);
        for index in keys::contest_indices(contest_id) {
            ks.remove_member(&index, user_id, now);
        }
        ks.remove_member(&keys::user_applications(user_id), contest_id, now);
        Ok(existed)
    }

    async fn get_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<Option<ContestApplication>, StoreError> {
        let now = self.clock.now();
        Self::load(&mut self.lock(), contest_id, user_id, now)
    }

    async fn get_pending_applications(
        &self,
        contest_id: i32,
    ) -> Result<Vec<ContestApplication>, StoreError> {
        let now = self.clock.now();
        let mut ks = self.lock();
        let user_ids = ks.sorted_members(&keys::pending_index(contest_id), now);

        Ok(user_ids
            .into_iter()
            .filter_map(|uid| Self::load_or_skip(&mut ks, contest_id, uid, now))
            .filter(|app| app.status == ApplicationStatus::Pending)
            .collect())
    }

    async fn get_accepted_applicants(&self, contest_id: i32) -> Result<Vec<i32>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .lock()
            .set_members(&keys::accepted_index(contest_id), now))
    }

    async fn get_user_applications(
        &self,
        user_id: i32,
    ) -> Result<Vec<ContestApplication>, StoreError> {
        let now = self.clock.now();
        let mut ks = self.lock();
        let contest_ids = ks.set_members(&keys::user_applications(user_id), now);

        let mut apps: Vec<ContestApplication> = contest_ids
            .into_iter()
            .filter_map(|cid| Self::load_or_skip(&mut ks, cid, user_id, now))
            .collect();
        apps.sort_by_key(|app| (app.requested_at, app.contest_id));
        Ok(apps)
    }

    async fn has_applied(&self, contest_id: i32, user_id: i32) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(Self::load(&mut self.lock(), contest_id, user_id, now)?
            .is_some_and(|app| app.status.blocks_reapplication()))
    }

    async fn extend_ttl(&self, contest_id: i32, ttl: Duration) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let expires_at = self.deadline(ttl);
        let mut ks = self.lock();
        let users = Self::indexed_users(&mut ks, contest_id, now);

        let mut touched = 0;
        for key in keys::contest_indices(contest_id) {
            touched += usize::from(ks.expire(&key, expires_at, now));
        }
        for &uid in &users {
            touched += usize::from(ks.expire(&keys::application(contest_id, uid), expires_at, now));
            ks.extend_only(&keys::user_applications(uid), expires_at, now);
        }
        Ok(touched)
    }

    async fn clear_applications(&self, contest_id: i32) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut ks = self.lock();
        let users = Self::indexed_users(&mut ks, contest_id, now);

        let mut removed = 0;
        for &uid in &users {
            removed += usize::from(ks.del(&keys::application(contest_id, uid), now));
            ks.remove_member(&keys::user_applications(uid), contest_id, now);
        }
        for key in keys::contest_indices(contest_id) {
            removed += usize::from(ks.del(&key, now));
        }
        Ok(removed)
    }
}
