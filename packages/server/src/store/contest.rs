use chrono::{DateTime, Utc};
use common::ContestStatus;
use sea_orm::sea_query::LockType;
use sea_orm::*;

use super::StoreError;
use super::membership::{self, NewMember};
use crate::domain::ContestDraft;
use crate::entity::contest;

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<contest::Model>, DbErr> {
    contest::Entity::find_by_id(id).one(db).await
}

/// Row-locks the contest for the rest of the transaction (`FOR UPDATE`).
pub async fn find_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<Option<contest::Model>, DbErr> {
    contest::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await
}

/// Inserts a pending contest and its leader row in one unit of work.
pub async fn create_with_leader<C>(
    db: &C,
    draft: ContestDraft,
    created_by: i32,
    now: DateTime<Utc>,
) -> Result<contest::Model, StoreError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let model = contest::ActiveModel {
        title: Set(draft.title.trim().to_string()),
        description: Set(draft.description),
        contest_type: Set(draft.contest_type),
        status: Set(ContestStatus::Pending),
        max_members: Set(draft.max_members),
        team_size: Set(draft.team_size),
        point_budget: Set(draft.point_budget),
        start_time: Set(draft.start_time),
        end_time: Set(draft.end_time),
        auto_start: Set(draft.auto_start),
        discord_guild_id: Set(draft.discord_guild_id),
        discord_channel_id: Set(draft.discord_channel_id),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    membership::save(&txn, NewMember::leader(model.id, created_by, now)).await?;

    txn.commit().await?;
    Ok(model)
}

/// Persists the mutable fields of a contest.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    model: contest::Model,
) -> Result<contest::Model, DbErr> {
    let mut active: contest::ActiveModel = model.clone().into();
    active.title = Set(model.title);
    active.description = Set(model.description);
    active.contest_type = Set(model.contest_type);
    active.status = Set(model.status);
    active.max_members = Set(model.max_members);
    active.team_size = Set(model.team_size);
    active.point_budget = Set(model.point_budget);
    active.start_time = Set(model.start_time);
    active.end_time = Set(model.end_time);
    active.auto_start = Set(model.auto_start);
    active.updated_at = Set(model.updated_at);
    active.update(db).await
}

/// IDs of pending auto-start contests whose start time has passed.
pub async fn find_due_auto_start<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> Result<Vec<i32>, DbErr> {
    contest::Entity::find()
        .select_only()
        .column(contest::Column::Id)
        .filter(contest::Column::Status.eq(ContestStatus::Pending))
        .filter(contest::Column::AutoStart.eq(true))
        .filter(contest::Column::StartTime.lte(now))
        .order_by_asc(contest::Column::StartTime)
        .into_tuple()
        .all(db)
        .await
}
