use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

/// Status of a join request while it lives in the application cache.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Waiting for the leader's decision.
    #[default]
    Pending,
    /// Approved; becomes a member when the contest starts.
    Accepted,
    /// Turned down. The user may apply again.
    Rejected,
}

impl ApplicationStatus {
    const NAMES: &'static [&'static str] = &["PENDING", "ACCEPTED", "REJECTED"];

    /// Returns true if this status blocks a new request for the same contest.
    pub fn blocks_reapplication(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(ParseEnumError::new("application status", s, Self::NAMES)),
        }
    }
}
