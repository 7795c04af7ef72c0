use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::domain::contest::ContestError;
use crate::store::StoreError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`,
    /// `INVALID_STATE`, `LINKING_REQUIRED`, `INTERNAL_ERROR`.
    #[schema(example = "CONFLICT")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Already applied to this contest")]
    pub message: String,
    /// Remediation hint, present for `LINKING_REQUIRED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    /// Acting user lacks the role required for the operation.
    PermissionDenied(String),
    NotFound(String),
    /// Target is already in the requested state (duplicate application,
    /// already-processed application, same-role change, full roster).
    Conflict(String),
    /// Contest status forbids the operation.
    InvalidState(String),
    /// Caller must link an external identity before continuing.
    LinkingRequired {
        hint: String,
    },
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TokenMissing => "TOKEN_MISSING",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::LinkingRequired { .. } => "LINKING_REQUIRED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let code = self.code();
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(code, msg)),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(code, "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(code, "Invalid or expired token"),
            ),
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, ErrorBody::new(code, msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new(code, msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new(code, msg)),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, ErrorBody::new(code, msg)),
            AppError::LinkingRequired { hint } => (
                StatusCode::PRECONDITION_REQUIRED,
                ErrorBody {
                    code,
                    message: "A linked Discord account is required".into(),
                    hint: Some(hint),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(code, "An unexpected error occurred"),
                )
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg)
            | AppError::PermissionDenied(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidState(msg)
            | AppError::Internal(msg) => write!(f, "{}: {msg}", self.code()),
            AppError::LinkingRequired { hint } => write!(f, "{}: {hint}", self.code()),
            AppError::TokenMissing | AppError::TokenInvalid => f.write_str(self.code()),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateApplication => {
                AppError::Conflict("Already applied to this contest".into())
            }
            StoreError::NotPending(status) => AppError::Conflict(format!(
                "Application has already been processed (status: {status})"
            )),
            StoreError::ApplicationNotFound => AppError::NotFound("Application not found".into()),
            StoreError::InvalidMember(msg) => AppError::Validation(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ContestError> for AppError {
    fn from(err: ContestError) -> Self {
        match err {
            ContestError::IllegalTransition { .. }
            | ContestError::NotStartable { .. }
            | ContestError::NotRunning(_) => AppError::InvalidState(err.to_string()),
            ContestError::EmptyChangeSet | ContestError::Invalid(_) => {
                AppError::Validation(err.to_string())
            }
        }
    }
}
