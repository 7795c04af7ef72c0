use chrono::{DateTime, Utc};
use common::ApplicationStatus;
use serde::Serialize;

use crate::store::{ContestApplication, SenderSnapshot};

#[derive(Serialize, utoipa::ToSchema)]
pub struct ApplicationResponse {
    pub contest_id: i32,
    pub user_id: i32,
    pub status: ApplicationStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Leader who accepted or rejected the request.
    pub processed_by: Option<i32>,
    /// Applicant profile captured at request time.
    pub sender: Option<SenderSnapshot>,
}

impl From<ContestApplication> for ApplicationResponse {
    fn from(app: ContestApplication) -> Self {
        Self {
            contest_id: app.contest_id,
            user_id: app.user_id,
            status: app.status,
            requested_at: app.requested_at,
            processed_at: app.processed_at,
            processed_by: app.processed_by,
            sender: app.sender,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ApplicationListResponse {
    pub data: Vec<ApplicationResponse>,
}

impl From<Vec<ContestApplication>> for ApplicationListResponse {
    fn from(apps: Vec<ContestApplication>) -> Self {
        Self {
            data: apps.into_iter().map(Into::into).collect(),
        }
    }
}
