use common::{ContestStatus, ContestType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String, // in Markdown
    pub contest_type: ContestType,
    pub status: ContestStatus,

    /// Upper bound on roster size, leader included. 0 means unlimited.
    pub max_members: i32,
    pub team_size: i32,
    pub point_budget: i32,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub auto_start: bool,

    pub discord_guild_id: Option<String>,
    pub discord_channel_id: Option<String>,

    pub created_by: i32,

    #[sea_orm(has_many)]
    pub members: HasMany<super::contest_member::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
