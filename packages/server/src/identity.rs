use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};

use crate::entity::user;
use crate::store::SenderSnapshot;

/// Hint returned when a user must link Discord before applying.
pub const LINK_DISCORD_HINT: &str =
    "Link your Discord account in your profile settings, then apply again.";

/// Profile and external identity of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: i32,
    pub username: String,
    pub discord_id: Option<String>,
    pub discord_tag: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserIdentity {
    pub fn is_linked(&self) -> bool {
        self.discord_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn snapshot(&self) -> SenderSnapshot {
        SenderSnapshot {
            username: self.username.clone(),
            discord_tag: self.discord_tag.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

impl From<user::Model> for UserIdentity {
    fn from(m: user::Model) -> Self {
        Self {
            user_id: m.id,
            username: m.username,
            discord_id: m.discord_id,
            discord_tag: m.discord_tag,
            avatar_url: m.avatar_url,
        }
    }
}

/// Answers "who is this user, and have they linked their external identity".
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, user_id: i32) -> Result<Option<UserIdentity>, DbErr>;
}

/// Reads the stored link from the user table.
pub struct DbIdentityResolver {
    db: DatabaseConnection,
}

impl DbIdentityResolver {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityResolver for DbIdentityResolver {
    async fn resolve(&self, user_id: i32) -> Result<Option<UserIdentity>, DbErr> {
        Ok(user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(UserIdentity::from))
    }
}
