#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

/// Lifecycle status of a contest.
///
/// Transitions form a fixed graph: `Pending -> Active -> Finished`,
/// `Pending -> Cancelled` and `Active -> Cancelled`. Finished and cancelled
/// contests are terminal.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestStatus {
    /// Accepting applications; not yet started.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PENDING"))]
    Pending,
    /// Started; the roster is frozen.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ACTIVE"))]
    Active,
    /// Stopped by the leader after running.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FINISHED"))]
    Finished,
    /// Called off before or during the run.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CANCELLED"))]
    Cancelled,
}

impl ContestStatus {
    pub const ALL: &'static [ContestStatus] = &[
        Self::Pending,
        Self::Active,
        Self::Finished,
        Self::Cancelled,
    ];

    const NAMES: &'static [&'static str] = &["PENDING", "ACTIVE", "FINISHED", "CANCELLED"];

    /// Returns true if `next` is reachable from `self` in one step.
    pub fn can_transition_to(&self, next: ContestStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Pending, Self::Cancelled)
                | (Self::Active, Self::Finished)
                | (Self::Active, Self::Cancelled)
        )
    }

    /// Returns true once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "FINISHED" => Ok(Self::Finished),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError::new("contest status", s, Self::NAMES)),
        }
    }
}

/// How participants compete in a contest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SOLO"))]
    Solo,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TEAM"))]
    Team,
}

impl ContestType {
    const NAMES: &'static [&'static str] = &["SOLO", "TEAM"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "SOLO",
            Self::Team => "TEAM",
        }
    }
}

impl fmt::Display for ContestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContestType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOLO" => Ok(Self::Solo),
            "TEAM" => Ok(Self::Team),
            _ => Err(ParseEnumError::new("contest type", s, Self::NAMES)),
        }
    }
}
