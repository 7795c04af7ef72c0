use common::{LifecycleEventType, MemberType};
use tracing::{info, instrument};

use super::{LifecycleService, contest_event, require_leader, require_pending};
use crate::entity::contest_member;
use crate::error::AppError;
use crate::store::membership::{self, MemberProfile, MemberQuery};

impl LifecycleService {
    /// Removes the caller from a pending contest's roster. The leader cannot leave.
    #[instrument(skip(self))]
    pub async fn withdraw_from_contest(&self, contest_id: i32, user_id: i32) -> Result<(), AppError> {
        let contest = self.load_contest(contest_id).await?;
        require_pending(&contest, "withdraw")?;

        let member = membership::get_by_contest_and_user(&self.db, contest_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Not a member of this contest".into()))?;
        if member.leader_type.is_leader() {
            return Err(AppError::PermissionDenied(
                "The contest leader cannot withdraw".into(),
            ));
        }

        // The accepted record goes first: left behind, it would re-add the
        // user at start.
        self.applications
            .remove_application(contest_id, user_id)
            .await?;
        membership::delete_by_id(&self.db, contest_id, user_id).await?;

        info!(contest_id, user_id, "Member withdrew");

        let now = self.now();
        let discord_user_id = self.discord_id_of(user_id).await;
        self.emit(
            contest_event(
                LifecycleEventType::MemberWithdrawn,
                &contest,
                user_id,
                "WITHDRAWN",
                now,
            )
            .with_discord_user(discord_user_id),
        );

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn change_member_role(
        &self,
        contest_id: i32,
        leader_id: i32,
        target_user_id: i32,
        member_type: MemberType,
    ) -> Result<contest_member::Model, AppError> {
        let contest = self.load_contest(contest_id).await?;
        require_pending(&contest, "change member roles")?;
        require_leader(&self.db, contest_id, leader_id).await?;

        let target = membership::get_by_contest_and_user(&self.db, contest_id, target_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".into()))?;
        if target.leader_type.is_leader() {
            return Err(AppError::PermissionDenied(
                "The contest leader's role cannot be changed".into(),
            ));
        }
        if target.member_type == member_type {
            return Err(AppError::Conflict(format!(
                "Member already has role {member_type}"
            )));
        }

        let updated =
            membership::update_member_type(&self.db, contest_id, target_user_id, member_type)
                .await?
                .ok_or_else(|| AppError::NotFound("Member not found".into()))?;

        info!(contest_id, target_user_id, member_type = %member_type, "Member role changed");
        Ok(updated)
    }

    /// One page of the roster with profiles, plus the total member count.
    pub async fn list_members(
        &self,
        contest_id: i32,
        query: MemberQuery,
    ) -> Result<(Vec<MemberProfile>, u64), AppError> {
        self.load_contest(contest_id).await?;
        Ok(membership::list_with_profiles(&self.db, contest_id, query).await?)
    }
}
