use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::member::*;
use crate::models::shared::Pagination;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/members",
    tag = "Members",
    operation_id = "listMembers",
    summary = "List contest members",
    description = "Paginated roster with member profiles. Sortable by `joined_at`, `point` or `username`.",
    params(("id" = i32, Path, description = "Contest ID"), MemberListQuery),
    responses(
        (status = 200, description = "Roster page", body = MemberListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_members(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MemberListQuery>,
) -> Result<Json<MemberListResponse>, AppError> {
    let query = query.into_query()?;
    let (members, total) = state.lifecycle.list_members(id, query).await?;

    Ok(Json(MemberListResponse {
        data: members.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(query.page, query.per_page, total),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}/members/me",
    tag = "Members",
    operation_id = "withdrawFromContest",
    summary = "Leave a pending contest",
    description = "Removes the caller from the roster while the contest is PENDING. The leader cannot withdraw.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 204, description = "Withdrawn"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found or caller not a member (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Contest is not PENDING (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn withdraw_from_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state
        .lifecycle
        .withdraw_from_contest(id, auth_user.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/v1/contests/{id}/members/{user_id}",
    tag = "Members",
    operation_id = "changeMemberRole",
    summary = "Change a member's track",
    description = "Leader only, contest PENDING. The leader's own role cannot change.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("user_id" = i32, Path, description = "Member user ID"),
    ),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = MembershipResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the leader, or target is the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest or member not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Role unchanged (CONFLICT), contest not PENDING (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(leader_id = auth_user.user_id))]
pub async fn change_member_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<ChangeRoleRequest>,
) -> Result<Json<MembershipResponse>, AppError> {
    let member = state
        .lifecycle
        .change_member_role(id, auth_user.user_id, user_id, payload.member_type)
        .await?;
    Ok(Json(member.into()))
}
