#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

/// Track a contest member belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberType {
    /// Organising staff. The contest creator is always staff.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "STAFF"))]
    Staff,
    /// Regular participant.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "NORMAL"))]
    Normal,
}

impl MemberType {
    const NAMES: &'static [&'static str] = &["STAFF", "NORMAL"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "STAFF",
            Self::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAFF" => Ok(Self::Staff),
            "NORMAL" => Ok(Self::Normal),
            _ => Err(ParseEnumError::new("member type", s, Self::NAMES)),
        }
    }
}

/// Whether a member leads the contest. Exactly one leader exists per contest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "LEADER"))]
    Leader,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MEMBER"))]
    Member,
}

impl LeaderType {
    const NAMES: &'static [&'static str] = &["LEADER", "MEMBER"];

    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::Member => "MEMBER",
        }
    }
}

impl fmt::Display for LeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEADER" => Ok(Self::Leader),
            "MEMBER" => Ok(Self::Member),
            _ => Err(ParseEnumError::new("leader type", s, Self::NAMES)),
        }
    }
}
