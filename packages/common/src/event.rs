use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Core event trait
pub trait Event: Send + Sync + Sized + Serialize + DeserializeOwned {
    /// Get the event topic (e.g., "application.requested")
    fn topic(&self) -> &str;

    /// Convert event to a generic event
    fn to_generic_event(&self) -> GenericEvent {
        GenericEvent {
            topic: self.topic().to_string(),
            payload: serde_json::to_value(self).unwrap_or_default(),
        }
    }

    /// Create an event from a generic event
    fn from_generic_event(e: &GenericEvent) -> Result<Self, anyhow::Error> {
        let payload: Self = serde_json::from_value(e.payload.clone())?;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl Event for GenericEvent {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn from_generic_event(e: &GenericEvent) -> Result<Self, anyhow::Error> {
        Ok(e.clone())
    }
}

/// Kinds of lifecycle events emitted by the contest engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEventType {
    #[serde(rename = "application.requested")]
    ApplicationRequested,
    #[serde(rename = "application.accepted")]
    ApplicationAccepted,
    #[serde(rename = "application.rejected")]
    ApplicationRejected,
    #[serde(rename = "application.cancelled")]
    ApplicationCancelled,
    #[serde(rename = "member.withdrawn")]
    MemberWithdrawn,
    #[serde(rename = "contest.created")]
    ContestCreated,
}

impl LifecycleEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationRequested => "application.requested",
            Self::ApplicationAccepted => "application.accepted",
            Self::ApplicationRejected => "application.rejected",
            Self::ApplicationCancelled => "application.cancelled",
            Self::MemberWithdrawn => "member.withdrawn",
            Self::ContestCreated => "contest.created",
        }
    }
}

impl fmt::Display for LifecycleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget notification about a contest lifecycle change.
///
/// External identity fields let downstream consumers (e.g. a Discord bot)
/// correlate the event without joining back against user or contest data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: String,
    pub event_type: LifecycleEventType,
    pub contest_id: i32,
    pub user_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_guild_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_channel_id: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(
        event_type: LifecycleEventType,
        contest_id: i32,
        user_id: i32,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            event_type,
            contest_id,
            user_id,
            discord_user_id: None,
            discord_guild_id: None,
            discord_channel_id: None,
            data: BTreeMap::new(),
            occurred_at,
        }
    }

    pub fn with_discord_user(mut self, discord_user_id: Option<String>) -> Self {
        self.discord_user_id = discord_user_id;
        self
    }

    pub fn with_discord_target(
        mut self,
        guild_id: Option<String>,
        channel_id: Option<String>,
    ) -> Self {
        self.discord_guild_id = guild_id;
        self.discord_channel_id = channel_id;
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

impl Event for LifecycleEvent {
    fn topic(&self) -> &str {
        self.event_type.as_str()
    }
}

/// Outbound port for lifecycle events.
///
/// Callers never wait on or react to the result beyond logging it.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &LifecycleEvent) -> anyhow::Result<()>;
}
