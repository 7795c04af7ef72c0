use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{LeaderType, MemberType};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use super::StoreError;
use crate::entity::{contest_member, user};

/// A roster row to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub contest_id: i32,
    pub user_id: i32,
    pub member_type: MemberType,
    pub leader_type: LeaderType,
    pub point: i32,
    pub joined_at: DateTime<Utc>,
}

impl NewMember {
    /// The contest creator: staff, leader, no points.
    pub fn leader(contest_id: i32, user_id: i32, joined_at: DateTime<Utc>) -> Self {
        Self {
            contest_id,
            user_id,
            member_type: MemberType::Staff,
            leader_type: LeaderType::Leader,
            point: 0,
            joined_at,
        }
    }

    /// An accepted applicant.
    pub fn participant(contest_id: i32, user_id: i32, joined_at: DateTime<Utc>) -> Self {
        Self {
            contest_id,
            user_id,
            member_type: MemberType::Normal,
            leader_type: LeaderType::Member,
            point: 0,
            joined_at,
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.leader_type.is_leader() && self.member_type != MemberType::Staff {
            return Err(StoreError::InvalidMember(
                "a leader must be a staff member".into(),
            ));
        }
        if self.point < 0 {
            return Err(StoreError::InvalidMember("point must be >= 0".into()));
        }
        Ok(())
    }

    fn into_active_model(self) -> contest_member::ActiveModel {
        contest_member::ActiveModel {
            contest_id: Set(self.contest_id),
            user_id: Set(self.user_id),
            member_type: Set(self.member_type),
            leader_type: Set(self.leader_type),
            point: Set(self.point),
            joined_at: Set(self.joined_at),
        }
    }
}

fn do_nothing_on_pk() -> OnConflict {
    OnConflict::columns([
        contest_member::Column::ContestId,
        contest_member::Column::UserId,
    ])
    .do_nothing()
    .to_owned()
}

/// Inserts one member unless the (contest, user) row already exists.
/// Returns whether a row was written.
pub async fn save<C: ConnectionTrait>(db: &C, member: NewMember) -> Result<bool, StoreError> {
    member.validate()?;

    let result = contest_member::Entity::insert(member.into_active_model())
        .on_conflict(do_nothing_on_pk())
        .exec_without_returning(db)
        .await;

    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Inserts every member not already on the roster, as one multi-row statement
/// inside its own unit of work. Returns the number of rows created.
pub async fn save_batch<C>(db: &C, members: Vec<NewMember>) -> Result<u64, StoreError>
where
    C: ConnectionTrait + TransactionTrait,
{
    for member in &members {
        member.validate()?;
    }

    let mut seen = HashSet::new();
    let members: Vec<NewMember> = members
        .into_iter()
        .filter(|m| seen.insert((m.contest_id, m.user_id)))
        .collect();
    if members.is_empty() {
        return Ok(0);
    }

    let txn = db.begin().await?;

    let contest_ids: Vec<i32> = members.iter().map(|m| m.contest_id).collect();
    let user_ids: Vec<i32> = members.iter().map(|m| m.user_id).collect();
    let existing: HashSet<(i32, i32)> = contest_member::Entity::find()
        .filter(contest_member::Column::ContestId.is_in(contest_ids))
        .filter(contest_member::Column::UserId.is_in(user_ids))
        .select_only()
        .column(contest_member::Column::ContestId)
        .column(contest_member::Column::UserId)
        .into_tuple::<(i32, i32)>()
        .all(&txn)
        .await?
        .into_iter()
        .collect();

    let fresh: Vec<contest_member::ActiveModel> = members
        .into_iter()
        .filter(|m| !existing.contains(&(m.contest_id, m.user_id)))
        .map(NewMember::into_active_model)
        .collect();

    if fresh.is_empty() {
        txn.commit().await?;
        return Ok(0);
    }

    let result = contest_member::Entity::insert_many(fresh)
        .on_conflict(do_nothing_on_pk())
        .exec_without_returning(&txn)
        .await;

    let created = match result {
        Ok(rows) => rows,
        Err(DbErr::RecordNotInserted) => 0,
        Err(e) => return Err(e.into()),
    };

    txn.commit().await?;
    Ok(created)
}

pub async fn get_by_contest_and_user<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    user_id: i32,
) -> Result<Option<contest_member::Model>, StoreError> {
    Ok(contest_member::Entity::find_by_id((contest_id, user_id))
        .one(db)
        .await?)
}

/// Changes a member's track. Returns the updated row, or `None` if absent.
pub async fn update_member_type<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    user_id: i32,
    member_type: MemberType,
) -> Result<Option<contest_member::Model>, StoreError> {
    let Some(existing) = get_by_contest_and_user(db, contest_id, user_id).await? else {
        return Ok(None);
    };
    if existing.leader_type.is_leader() && member_type != MemberType::Staff {
        return Err(StoreError::InvalidMember(
            "a leader must be a staff member".into(),
        ));
    }

    let mut active: contest_member::ActiveModel = existing.into();
    active.member_type = Set(member_type);
    Ok(Some(active.update(db).await?))
}

/// Deletes one roster row. Returns whether it existed.
pub async fn delete_by_id<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    user_id: i32,
) -> Result<bool, StoreError> {
    let result = contest_member::Entity::delete_by_id((contest_id, user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn count_by_contest<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<u64, StoreError> {
    Ok(contest_member::Entity::find()
        .filter(contest_member::Column::ContestId.eq(contest_id))
        .count(db)
        .await?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberSort {
    #[default]
    JoinedAt,
    Point,
    Username,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberQuery {
    pub sort: MemberSort,
    pub order: SortOrder,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
}

/// Largest row count a SQL backend accepts for `LIMIT` and `OFFSET`.
const MAX_ROWS: u64 = i64::MAX as u64;

impl MemberQuery {
    /// Page size, at least one row.
    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_ROWS)
    }

    /// Rows skipped before the requested page. Pages past the end saturate
    /// and read nothing.
    pub fn offset(&self) -> u64 {
        Ord::min(
            (Ord::max(self.page, 1) - 1).saturating_mul(self.limit()),
            MAX_ROWS,
        )
    }
}

impl Default for MemberQuery {
    fn default() -> Self {
        Self {
            sort: MemberSort::JoinedAt,
            order: SortOrder::Asc,
            page: 1,
            per_page: 20,
        }
    }
}

/// Roster row joined with the member's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub contest_id: i32,
    pub user_id: i32,
    pub username: String,
    pub discord_tag: Option<String>,
    pub avatar_url: Option<String>,
    pub member_type: MemberType,
    pub leader_type: LeaderType,
    pub point: i32,
    pub joined_at: DateTime<Utc>,
}

/// One page of the roster plus the total member count.
pub async fn list_with_profiles<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    query: MemberQuery,
) -> Result<(Vec<MemberProfile>, u64), StoreError> {
    let base = contest_member::Entity::find()
        .filter(contest_member::Column::ContestId.eq(contest_id));
    let total = base.clone().count(db).await?;

    let order = Order::from(query.order);
    let select = base.find_also_related(user::Entity);
    let select = match query.sort {
        MemberSort::JoinedAt => select.order_by(contest_member::Column::JoinedAt, order),
        MemberSort::Point => select.order_by(contest_member::Column::Point, order),
        MemberSort::Username => select.order_by(user::Column::Username, order),
    };

    let rows = select
        .order_by_asc(contest_member::Column::UserId)
        .offset(Some(query.offset()))
        .limit(Some(query.limit()))
        .all(db)
        .await?;

    let items = rows
        .into_iter()
        .map(|(member, profile)| {
            let (username, discord_tag, avatar_url) = profile
                .map(|u| (u.username, u.discord_tag, u.avatar_url))
                .unwrap_or_default();
            MemberProfile {
                contest_id: member.contest_id,
                user_id: member.user_id,
                username,
                discord_tag,
                avatar_url,
                member_type: member.member_type,
                leader_type: member.leader_type,
                point: member.point,
                joined_at: member.joined_at,
            }
        })
        .collect();

    Ok((items, total))
}
