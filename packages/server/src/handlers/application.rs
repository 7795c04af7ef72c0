use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::application::*;
use crate::service::ParticipationOutcome;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/applications",
    tag = "Applications",
    operation_id = "requestParticipate",
    summary = "Apply to join a contest",
    description = "Files a PENDING application for the caller. Requires a linked Discord account; without one the response is 428 with a remediation hint and nothing is stored. A rejected applicant may apply again.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 201, description = "Application filed", body = ApplicationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest or user not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already applied or already a member (CONFLICT), or applications closed (INVALID_STATE)", body = ErrorBody),
        (status = 428, description = "Discord account not linked (LINKING_REQUIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn request_participate(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    match state
        .lifecycle
        .request_participate(id, auth_user.user_id)
        .await?
    {
        ParticipationOutcome::Requested(app) => {
            Ok((StatusCode::CREATED, Json(ApplicationResponse::from(app))))
        }
        ParticipationOutcome::LinkingRequired { hint } => Err(AppError::LinkingRequired { hint }),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/contests/{id}/applications",
    tag = "Applications",
    operation_id = "cancelApplication",
    summary = "Withdraw your pending application",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Application withdrawn", body = ApplicationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No application (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Application already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn cancel_application(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let app = state
        .lifecycle
        .cancel_application(id, auth_user.user_id)
        .await?;
    Ok(Json(app.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/contests/{id}/applications",
    tag = "Applications",
    operation_id = "listPendingApplications",
    summary = "List pending applications",
    description = "Leader only. Oldest request first.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Pending applications", body = ApplicationListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_pending_applications(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let apps = state
        .lifecycle
        .list_pending_applications(id, auth_user.user_id)
        .await?;
    Ok(Json(apps.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/applications/{user_id}/accept",
    tag = "Applications",
    operation_id = "acceptApplication",
    summary = "Accept a pending application",
    description = "Leader only, contest PENDING. Refused once the roster cap is reached.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("user_id" = i32, Path, description = "Applicant user ID"),
    ),
    responses(
        (status = 200, description = "Application accepted", body = ApplicationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest or application not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already decided or contest full (CONFLICT), contest not PENDING (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(leader_id = auth_user.user_id))]
pub async fn accept_application(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let app = state
        .lifecycle
        .accept_application(id, auth_user.user_id, user_id)
        .await?;
    Ok(Json(app.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/contests/{id}/applications/{user_id}/reject",
    tag = "Applications",
    operation_id = "rejectApplication",
    summary = "Reject a pending application",
    description = "Leader only, contest PENDING. The applicant may apply again.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("user_id" = i32, Path, description = "Applicant user ID"),
    ),
    responses(
        (status = 200, description = "Application rejected", body = ApplicationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest or application not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already decided (CONFLICT), contest not PENDING (INVALID_STATE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(leader_id = auth_user.user_id))]
pub async fn reject_application(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let app = state
        .lifecycle
        .reject_application(id, auth_user.user_id, user_id)
        .await?;
    Ok(Json(app.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me/applications",
    tag = "Applications",
    operation_id = "listMyApplications",
    summary = "List your live applications",
    description = "Applications across all contests that have not expired or been cleared, oldest first.",
    responses(
        (status = 200, description = "Caller's applications", body = ApplicationListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_my_applications(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let apps = state
        .lifecycle
        .list_my_applications(auth_user.user_id)
        .await?;
    Ok(Json(apps.into()))
}
