use common::{ApplicationStatus, LifecycleEventType};
use sea_orm::TransactionTrait;
use tracing::{info, instrument, warn};

use super::{LifecycleService, ParticipationOutcome, contest_event, require_leader, require_pending};
use crate::error::AppError;
use crate::identity::LINK_DISCORD_HINT;
use crate::store::contest as contest_store;
use crate::store::membership::{self, NewMember};
use crate::store::ContestApplication;

impl LifecycleService {
    /// Files a join request for `user_id`.
    ///
    /// Users without a linked Discord account get `LinkingRequired` back and
    /// nothing is stored.
    #[instrument(skip(self))]
    pub async fn request_participate(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<ParticipationOutcome, AppError> {
        let identity = self
            .identity
            .resolve(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        if !identity.is_linked() {
            return Ok(ParticipationOutcome::LinkingRequired {
                hint: LINK_DISCORD_HINT.to_string(),
            });
        }

        let contest = self.load_contest(contest_id).await?;
        require_pending(&contest, "apply")?;
        let now = self.now();
        if now >= contest.start_time {
            return Err(AppError::InvalidState(
                "Applications close at the contest's scheduled start".into(),
            ));
        }
        if membership::get_by_contest_and_user(&self.db, contest_id, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Already a member of this contest".into(),
            ));
        }

        let sender = identity.snapshot();
        let application = ContestApplication::pending(contest_id, user_id, now, Some(sender.clone()));
        let ttl = self.application_ttl(&contest, now);
        self.applications
            .request_participate(&application, ttl)
            .await?;

        info!(contest_id, user_id, ttl_secs = ttl.as_secs(), "Application requested");

        self.emit(
            contest_event(
                LifecycleEventType::ApplicationRequested,
                &contest,
                user_id,
                ApplicationStatus::Pending.as_str(),
                now,
            )
            .with_discord_user(identity.discord_id.clone())
            .with_data("sender", serde_json::to_value(&sender).unwrap_or_default()),
        );

        Ok(ParticipationOutcome::Requested(application))
    }

    /// Accepts a pending application. The applicant's roster row is written
    /// right away; if that write fails, starting the contest backfills it.
    ///
    /// The contest row stays locked from the capacity check until the
    /// application is marked accepted, so concurrent accepts cannot overfill
    /// the contest.
    #[instrument(skip(self))]
    pub async fn accept_application(
        &self,
        contest_id: i32,
        leader_id: i32,
        user_id: i32,
    ) -> Result<ContestApplication, AppError> {
        let txn = self.db.begin().await?;
        let contest = contest_store::find_for_update(&txn, contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
        require_pending(&contest, "accept applications")?;
        require_leader(&txn, contest_id, leader_id).await?;

        if contest.max_members > 0 {
            let accepted = self.applications.get_accepted_applicants(contest_id).await?;
            let roster = membership::count_by_contest(&txn, contest_id).await?;
            // The leader holds one seat that is not in the accepted index.
            let occupied = roster.max(1 + accepted.len() as u64);
            if occupied >= contest.max_members as u64 {
                return Err(AppError::Conflict(format!(
                    "Contest is full ({} members)",
                    contest.max_members
                )));
            }
        }

        let now = self.now();
        let application = self
            .applications
            .accept_request(contest_id, user_id, leader_id, now)
            .await?;
        txn.commit().await?;

        if let Err(e) =
            membership::save(&self.db, NewMember::participant(contest_id, user_id, now)).await
        {
            warn!(
                contest_id,
                user_id,
                error = %e,
                "Failed to write member on accept; contest start will reconcile"
            );
        }

        info!(contest_id, user_id, leader_id, "Application accepted");

        let discord_user_id = self.discord_id_of(user_id).await;
        self.emit(
            contest_event(
                LifecycleEventType::ApplicationAccepted,
                &contest,
                user_id,
                ApplicationStatus::Accepted.as_str(),
                now,
            )
            .with_discord_user(discord_user_id)
            .with_data("decided_by", leader_id),
        );

        Ok(application)
    }

    #[instrument(skip(self))]
    pub async fn reject_application(
        &self,
        contest_id: i32,
        leader_id: i32,
        user_id: i32,
    ) -> Result<ContestApplication, AppError> {
        let contest = self.load_contest(contest_id).await?;
        require_pending(&contest, "reject applications")?;
        require_leader(&self.db, contest_id, leader_id).await?;

        let now = self.now();
        let application = self
            .applications
            .reject_request(contest_id, user_id, leader_id, now)
            .await?;

        info!(contest_id, user_id, leader_id, "Application rejected");

        let discord_user_id = self.discord_id_of(user_id).await;
        self.emit(
            contest_event(
                LifecycleEventType::ApplicationRejected,
                &contest,
                user_id,
                ApplicationStatus::Rejected.as_str(),
                now,
            )
            .with_discord_user(discord_user_id)
            .with_data("decided_by", leader_id),
        );

        Ok(application)
    }

    /// Withdraws the caller's own pending application.
    #[instrument(skip(self))]
    pub async fn cancel_application(
        &self,
        contest_id: i32,
        user_id: i32,
    ) -> Result<ContestApplication, AppError> {
        let contest = self.load_contest(contest_id).await?;
        let application = self
            .applications
            .cancel_application(contest_id, user_id)
            .await?;

        info!(contest_id, user_id, "Application cancelled");

        let now = self.now();
        let discord_user_id = self.discord_id_of(user_id).await;
        self.emit(
            contest_event(
                LifecycleEventType::ApplicationCancelled,
                &contest,
                user_id,
                "CANCELLED",
                now,
            )
            .with_discord_user(discord_user_id),
        );

        Ok(application)
    }

    /// Pending applications of a contest, oldest first. Leader only.
    #[instrument(skip(self))]
    pub async fn list_pending_applications(
        &self,
        contest_id: i32,
        leader_id: i32,
    ) -> Result<Vec<ContestApplication>, AppError> {
        self.load_contest(contest_id).await?;
        require_leader(&self.db, contest_id, leader_id).await?;
        Ok(self
            .applications
            .get_pending_applications(contest_id)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_my_applications(
        &self,
        user_id: i32,
    ) -> Result<Vec<ContestApplication>, AppError> {
        Ok(self.applications.get_user_applications(user_id).await?)
    }
}
