use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Platform user profile. Owned by the account service; read-only here.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Linked Discord account. NULL until the user completes linking.
    pub discord_id: Option<String>,
    pub discord_tag: Option<String>,
    pub avatar_url: Option<String>,

    #[sea_orm(has_many)]
    pub memberships: HasMany<super::contest_member::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
