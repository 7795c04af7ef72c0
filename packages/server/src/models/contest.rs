use chrono::{DateTime, Utc};
use common::{ContestStatus, ContestType};
use serde::{Deserialize, Serialize};

use crate::domain::{ContestChangeSet, ContestDraft};
use crate::entity::contest;
use crate::service::StartOutcome;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContestRequest {
    /// Contest title (1-256 characters).
    #[schema(example = "Spring Cup 2026")]
    pub title: String,
    /// Markdown description.
    #[serde(default)]
    pub description: String,
    pub contest_type: ContestType,
    /// Roster cap, leader included. 0 means unlimited.
    #[serde(default)]
    pub max_members: i32,
    #[serde(default)]
    pub team_size: i32,
    #[serde(default)]
    pub point_budget: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Start automatically once `start_time` passes.
    #[serde(default)]
    pub auto_start: bool,
    pub discord_guild_id: Option<String>,
    pub discord_channel_id: Option<String>,
}

impl From<CreateContestRequest> for ContestDraft {
    fn from(req: CreateContestRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            description: req.description,
            contest_type: req.contest_type,
            max_members: req.max_members,
            team_size: req.team_size,
            point_budget: req.point_budget,
            start_time: req.start_time,
            end_time: req.end_time,
            auto_start: req.auto_start,
            discord_guild_id: req.discord_guild_id,
            discord_channel_id: req.discord_channel_id,
        }
    }
}

/// Partial update. Absent fields are left unchanged; at least one is required.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateContestRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub contest_type: Option<ContestType>,
    pub max_members: Option<i32>,
    pub team_size: Option<i32>,
    pub point_budget: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub auto_start: Option<bool>,
}

impl From<UpdateContestRequest> for ContestChangeSet {
    fn from(req: UpdateContestRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            contest_type: req.contest_type,
            max_members: req.max_members,
            team_size: req.team_size,
            point_budget: req.point_budget,
            start_time: req.start_time,
            end_time: req.end_time,
            auto_start: req.auto_start,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub contest_type: ContestType,
    pub status: ContestStatus,
    pub max_members: i32,
    pub team_size: i32,
    pub point_budget: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub auto_start: bool,
    pub discord_guild_id: Option<String>,
    pub discord_channel_id: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<contest::Model> for ContestResponse {
    fn from(m: contest::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            contest_type: m.contest_type,
            status: m.status,
            max_members: m.max_members,
            team_size: m.team_size,
            point_budget: m.point_budget,
            start_time: m.start_time,
            end_time: m.end_time,
            auto_start: m.auto_start,
            discord_guild_id: m.discord_guild_id,
            discord_channel_id: m.discord_channel_id,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StartContestResponse {
    pub contest: ContestResponse,
    /// Roster rows created from accepted applications at start.
    #[schema(example = 12)]
    pub members_created: u64,
}

impl From<StartOutcome> for StartContestResponse {
    fn from(outcome: StartOutcome) -> Self {
        Self {
            contest: outcome.contest.into(),
            members_created: outcome.members_created,
        }
    }
}
