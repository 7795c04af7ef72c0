use common::LifecycleEventType;
use sea_orm::TransactionTrait;
use tracing::{error, info, instrument, warn};

use super::{LifecycleService, contest_event, require_leader, require_pending};
use crate::domain::{ContestChangeSet, ContestDraft};
use crate::entity::contest as contest_entity;
use crate::error::AppError;
use crate::store::contest as contest_store;
use crate::store::membership::{self, NewMember};

/// Result of a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub contest: contest_entity::Model,
    /// Roster rows created from the accepted snapshot. Applicants already
    /// written at accept time are not counted.
    pub members_created: u64,
}

impl LifecycleService {
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_contest(
        &self,
        creator_id: i32,
        draft: ContestDraft,
    ) -> Result<contest_entity::Model, AppError> {
        let now = self.now();
        draft.validate(now)?;

        if self.identity.resolve(creator_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }

        let contest = contest_store::create_with_leader(&self.db, draft, creator_id, now).await?;

        info!(contest_id = contest.id, creator_id, "Contest created");

        self.emit(contest_event(
            LifecycleEventType::ContestCreated,
            &contest,
            creator_id,
            contest.status.as_str(),
            now,
        ));

        Ok(contest)
    }

    pub async fn get_contest(&self, contest_id: i32) -> Result<contest_entity::Model, AppError> {
        self.load_contest(contest_id).await
    }

    /// Edits a pending contest. Moving the start re-anchors the expiry of
    /// its application records.
    #[instrument(skip(self, changes))]
    pub async fn update_contest(
        &self,
        contest_id: i32,
        leader_id: i32,
        changes: ContestChangeSet,
    ) -> Result<contest_entity::Model, AppError> {
        let now = self.now();
        let txn = self.db.begin().await?;

        let mut contest = contest_store::find_for_update(&txn, contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
        require_leader(&txn, contest_id, leader_id).await?;
        require_pending(&contest, "edit contest")?;

        let start_moved = contest.apply(changes, now)?;
        let contest = contest_store::update(&txn, contest).await?;
        txn.commit().await?;

        if start_moved {
            let ttl = self.application_ttl(&contest, now);
            match self.applications.extend_ttl(contest_id, ttl).await {
                Ok(touched) => info!(contest_id, touched, "Application TTL re-anchored"),
                Err(e) => warn!(contest_id, error = %e, "Failed to re-anchor application TTL"),
            }
        }

        Ok(contest)
    }

    /// Leader-initiated start.
    #[instrument(skip(self))]
    pub async fn start_contest(
        &self,
        contest_id: i32,
        leader_id: i32,
    ) -> Result<StartOutcome, AppError> {
        self.start(contest_id, Some(leader_id)).await
    }

    /// Migrates the accepted snapshot into the roster and moves the contest
    /// to ACTIVE in one unit of work, then clears the contest's cache state.
    ///
    /// The contest row is locked for the duration, so a concurrent start fails
    /// the status check instead of migrating twice. `actor` is `None` for
    /// system-initiated starts.
    async fn start(&self, contest_id: i32, actor: Option<i32>) -> Result<StartOutcome, AppError> {
        let accepted = self
            .applications
            .get_accepted_applicants(contest_id)
            .await?;

        let now = self.now();
        let txn = self.db.begin().await?;

        let mut contest = contest_store::find_for_update(&txn, contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
        if let Some(leader_id) = actor {
            require_leader(&txn, contest_id, leader_id).await?;
        }
        contest.ensure_can_start(now)?;

        let members = accepted
            .iter()
            .map(|&uid| NewMember::participant(contest_id, uid, now))
            .collect();
        let members_created = membership::save_batch(&txn, members).await?;

        contest.start(now)?;
        let contest = contest_store::update(&txn, contest).await?;
        txn.commit().await?;

        info!(
            contest_id,
            accepted = accepted.len(),
            members_created,
            "Contest started"
        );

        self.clear_application_cache(contest_id).await;

        Ok(StartOutcome {
            contest,
            members_created,
        })
    }

    #[instrument(skip(self))]
    pub async fn stop_contest(
        &self,
        contest_id: i32,
        leader_id: i32,
    ) -> Result<contest_entity::Model, AppError> {
        let now = self.now();
        let txn = self.db.begin().await?;

        let mut contest = contest_store::find_for_update(&txn, contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
        require_leader(&txn, contest_id, leader_id).await?;
        contest.stop(now)?;

        let contest = contest_store::update(&txn, contest).await?;
        txn.commit().await?;

        info!(contest_id, "Contest finished");
        Ok(contest)
    }

    /// Cancels a pending or running contest and drops its application state.
    #[instrument(skip(self))]
    pub async fn cancel_contest(
        &self,
        contest_id: i32,
        leader_id: i32,
    ) -> Result<contest_entity::Model, AppError> {
        let now = self.now();
        let txn = self.db.begin().await?;

        let mut contest = contest_store::find_for_update(&txn, contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
        require_leader(&txn, contest_id, leader_id).await?;
        contest.cancel(now)?;

        let contest = contest_store::update(&txn, contest).await?;
        txn.commit().await?;

        info!(contest_id, "Contest cancelled");

        self.clear_application_cache(contest_id).await;
        Ok(contest)
    }

    /// Starts every due auto-start contest. Each contest is handled on its own;
    /// a failure is logged and does not stop the sweep. Returns how many started.
    pub async fn auto_start_due_contests(&self) -> Result<usize, AppError> {
        let due = contest_store::find_due_auto_start(&self.db, self.now()).await?;
        if due.is_empty() {
            return Ok(0);
        }

        info!(count = due.len(), "Auto-starting due contests");

        let mut started = 0;
        for contest_id in due {
            match self.start(contest_id, None).await {
                Ok(_) => started += 1,
                Err(e) => error!(contest_id, error = %e, "Auto-start failed"),
            }
        }
        Ok(started)
    }

    /// Cache cleanup after a contest leaves PENDING. TTL is the backstop.
    async fn clear_application_cache(&self, contest_id: i32) {
        match self.applications.clear_applications(contest_id).await {
            Ok(removed) => info!(contest_id, removed, "Application cache cleared"),
            Err(e) => warn!(
                contest_id,
                error = %e,
                "Failed to clear application cache; records expire with their TTL"
            ),
        }
    }
}
