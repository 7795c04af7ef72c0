use chrono::{DateTime, Utc};
use common::{LeaderType, MemberType};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::Pagination;
use crate::entity::contest_member;
use crate::error::AppError;
use crate::store::membership::{MemberProfile, MemberQuery, MemberSort, SortOrder};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberListQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    pub per_page: Option<u64>,
    /// One of `joined_at`, `point`, `username`. Default: `joined_at`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`. Default: `asc`.
    pub sort_order: Option<String>,
}

impl MemberListQuery {
    pub fn into_query(self) -> Result<MemberQuery, AppError> {
        let sort = match self.sort_by.as_deref().unwrap_or("joined_at") {
            "joined_at" => MemberSort::JoinedAt,
            "point" => MemberSort::Point,
            "username" => MemberSort::Username,
            _ => {
                return Err(AppError::Validation(
                    "sort_by must be one of: joined_at, point, username".into(),
                ));
            }
        };
        let order = match self.sort_order.as_deref().unwrap_or("asc") {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => {
                return Err(AppError::Validation(
                    "sort_order must be asc or desc".into(),
                ));
            }
        };
        Ok(MemberQuery {
            sort,
            order,
            page: Ord::max(self.page.unwrap_or(1), 1),
            per_page: self.per_page.unwrap_or(20).clamp(1, 100),
        })
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MemberResponse {
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

impl From<MemberProfile> for MemberResponse {
    fn from(p: MemberProfile) -> Self {
        Self {
            contest_id: p.contest_id,
            user_id: p.user_id,
            username: p.username,
            discord_tag: p.discord_tag,
            avatar_url: p.avatar_url,
            member_type: p.member_type,
            leader_type: p.leader_type,
            point: p.point,
            joined_at: p.joined_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MemberListResponse {
    pub data: Vec<MemberResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChangeRoleRequest {
    pub member_type: MemberType,
}

/// Roster row without profile fields, returned after a role change.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MembershipResponse {
    pub contest_id: i32,
    pub user_id: i32,
    pub member_type: MemberType,
    pub leader_type: LeaderType,
    pub point: i32,
    pub joined_at: DateTime<Utc>,
}

impl From<contest_member::Model> for MembershipResponse {
    fn from(m: contest_member::Model) -> Self {
        Self {
            contest_id: m.contest_id,
            user_id: m.user_id,
            member_type: m.member_type,
            leader_type: m.leader_type,
            point: m.point,
            joined_at: m.joined_at,
        }
    }
}
