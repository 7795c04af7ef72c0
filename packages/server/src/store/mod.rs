pub mod contest;
pub mod keys;
pub mod membership;
pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ApplicationStatus;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryApplicationStore;
pub use self::redis::RedisApplicationStore;

/// Profile details captured once, when the request is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SenderSnapshot {
    pub username: String,
    pub discord_tag: Option<String>,
    pub avatar_url: Option<String>,
}

/// A join request as stored in the application cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestApplication {
    pub contest_id: i32,
    pub user_id: i32,
    pub status: ApplicationStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: Option<i32>,
    #[serde(default)]
    pub sender: Option<SenderSnapshot>,
}

impl ContestApplication {
    pub fn pending(
        contest_id: i32,
        user_id: i32,
        requested_at: DateTime<Utc>,
        sender: Option<SenderSnapshot>,
    ) -> Self {
        Self {
            contest_id,
            user_id,
            status: ApplicationStatus::Pending,
            requested_at,
            processed_at: None,
            processed_by: None,
            sender,
        }
    }

    /// Records a leader decision. Only valid on a pending application.
    pub(crate) fn decide(
        &mut self,
        status: ApplicationStatus,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.status != ApplicationStatus::Pending {
            return Err(StoreError::NotPending(self.status));
        }
        self.status = status;
        self.processed_at = Some(at);
        self.processed_by = Some(processed_by);
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub(crate) fn from_json(raw: &str) -> Result<Self, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Application already exists for this contest")]
    DuplicateApplication,
    #[error("Application is not pending (status: {0})")]
    NotPending(ApplicationStatus),
    #[error("Application not found")]
    ApplicationNotFound,
    #[error("Invalid member: {0}")]
    InvalidMember(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Cache(err.to_string())
    }
}

/// Cache-side bookkeeping of the join-request workflow.
///
/// Implementations must apply each mutation's record and index writes as one
/// atomic step, and must only ever extend the TTL of the shared per-user index.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Stores a new pending application. A rejected record is replaced;
    /// a pending or accepted one fails with `DuplicateApplication`.
    async fn request_participate(
        &self,
        application: &ContestApplication,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    async fn accept_request(
        &self,
        contest_id: i32,
        user_id: i32,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError>;

    async fn reject_request(
        &self,
        contest_id: i32,
        user_id: i32,
        processed_by: i32,
        at: DateTime<Utc>,
    ) -> Result<ContestApplication, StoreError>;

    /// Withdraws a pending application and drops it from every index.
    async fn cancel_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<ContestApplication, StoreError>;

    /// Drops a user's record and index entries for one contest, whatever the
    /// status. Returns whether a record existed.
    async fn remove_application(&self, contest_id: i32, user_id: i32) -> Result<bool, StoreError>;

    async fn get_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<Option<ContestApplication>, StoreError>;

    /// Pending applications, oldest request first.
    async fn get_pending_applications(
        &self,
        contest_id: i32,
    ) -> Result<Vec<ContestApplication>, StoreError>;

    /// User IDs in the accepted index, ascending.
    async fn get_accepted_applicants(&self, contest_id: i32) -> Result<Vec<i32>, StoreError>;

    /// Live applications of one user across contests, oldest first.
    async fn get_user_applications(
        &self,
        user_id: i32,
    ) -> Result<Vec<ContestApplication>, StoreError>;

    async fn has_applied(&self, contest_id: i32, user_id: i32) -> Result<bool, StoreError>;

    /// Re-anchors every key of the contest to `ttl`. Returns keys touched.
    async fn extend_ttl(&self, contest_id: i32, ttl: Duration) -> Result<usize, StoreError>;

    /// Removes every key of the contest. Returns keys removed.
    async fn clear_applications(&self, contest_id: i32) -> Result<usize, StoreError>;
}

/// Whole seconds for an expiry, never below one.
pub(crate) fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
}
