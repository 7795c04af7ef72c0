//! Contest lifecycle orchestration.
//!
//! The service owns no storage. It checks preconditions across the application
//! cache and the relational store, drives the application workflow, migrates
//! accepted applicants when a contest starts, and hands events to the
//! dispatcher without waiting on them.

mod application;
mod contest;
mod member;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{ContestStatus, LifecycleEvent, LifecycleEventType};
use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::clock::Clock;
use crate::dispatch::EventDispatcher;
use crate::entity::{contest as contest_entity, contest_member};
use crate::error::AppError;
use crate::identity::IdentityResolver;
use crate::store::{ApplicationStore, ContestApplication, membership};

pub use contest::StartOutcome;

/// Result of a join request that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipationOutcome {
    Requested(ContestApplication),
    /// The user has no linked external identity. Nothing was stored.
    LinkingRequired { hint: String },
}

pub struct LifecycleService {
    db: DatabaseConnection,
    applications: Arc<dyn ApplicationStore>,
    identity: Arc<dyn IdentityResolver>,
    events: EventDispatcher,
    clock: Arc<dyn Clock>,
    fallback_ttl: Duration,
}

impl LifecycleService {
    pub fn new(
        db: DatabaseConnection,
        applications: Arc<dyn ApplicationStore>,
        identity: Arc<dyn IdentityResolver>,
        events: EventDispatcher,
        clock: Arc<dyn Clock>,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            db,
            applications,
            identity,
            events,
            clock,
            fallback_ttl,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load_contest(&self, contest_id: i32) -> Result<contest_entity::Model, AppError> {
        crate::store::contest::find(&self.db, contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))
    }

    /// Application records expire at the scheduled start, or after the
    /// fallback window once the start has passed.
    fn application_ttl(&self, contest: &contest_entity::Model, now: DateTime<Utc>) -> Duration {
        (contest.start_time - now)
            .to_std()
            .ok()
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.fallback_ttl)
    }

    /// Best-effort lookup of a user's Discord ID for event correlation.
    async fn discord_id_of(&self, user_id: i32) -> Option<String> {
        match self.identity.resolve(user_id).await {
            Ok(identity) => identity.and_then(|i| i.discord_id),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Identity lookup for event failed");
                None
            }
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        self.events.dispatch(event);
    }
}

/// Fails with `PermissionDenied` unless `user_id` is the contest's leader.
/// Checked on every call; leadership is never cached.
async fn require_leader<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    user_id: i32,
) -> Result<contest_member::Model, AppError> {
    match membership::get_by_contest_and_user(db, contest_id, user_id).await? {
        Some(m) if m.leader_type.is_leader() => Ok(m),
        _ => Err(AppError::PermissionDenied(
            "Only the contest leader can perform this action".into(),
        )),
    }
}

fn require_pending(contest: &contest_entity::Model, action: &str) -> Result<(), AppError> {
    if contest.status != ContestStatus::Pending {
        return Err(AppError::InvalidState(format!(
            "Cannot {action}: contest is {}",
            contest.status
        )));
    }
    Ok(())
}

/// Event skeleton carrying the contest context every consumer expects.
fn contest_event(
    kind: LifecycleEventType,
    contest: &contest_entity::Model,
    user_id: i32,
    status_label: &str,
    now: DateTime<Utc>,
) -> LifecycleEvent {
    LifecycleEvent::new(kind, contest.id, user_id, now)
        .with_discord_target(
            contest.discord_guild_id.clone(),
            contest.discord_channel_id.clone(),
        )
        .with_data("contest_title", contest.title.clone())
        .with_data("status", status_label)
        .with_data("timestamp", now.to_rfc3339())
}
