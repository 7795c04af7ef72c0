use chrono::{DateTime, Utc};
use common::{ContestStatus, ContestType};
use thiserror::Error;

use crate::entity::contest;

const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_BYTES: usize = 1_000_000;

/// Rule violations raised by the contest state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContestError {
    #[error("Cannot move contest from {from} to {to}")]
    IllegalTransition {
        from: ContestStatus,
        to: ContestStatus,
    },
    #[error("Contest cannot start before its scheduled start time ({start_time})")]
    NotStartable { start_time: DateTime<Utc> },
    #[error("Contest is not running (status: {0})")]
    NotRunning(ContestStatus),
    #[error("No changes supplied")]
    EmptyChangeSet,
    #[error("{0}")]
    Invalid(String),
}

/// Fields of a contest that do not come from the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestDraft {
    pub title: String,
    pub description: String,
    pub contest_type: ContestType,
    pub max_members: i32,
    pub team_size: i32,
    pub point_budget: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub auto_start: bool,
    pub discord_guild_id: Option<String>,
    pub discord_channel_id: Option<String>,
}

impl ContestDraft {
    /// Checks the draft for creation at `now`. The start must lie in the future.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ContestError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_window(self.start_time, self.end_time)?;
        validate_counts(self.max_members, self.team_size, self.point_budget)?;
        if self.start_time <= now {
            return Err(ContestError::Invalid(
                "start_time must be in the future".into(),
            ));
        }
        Ok(())
    }
}

/// Administrative edit of a pending contest. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContestChangeSet {
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

impl ContestChangeSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// State machine operations on a loaded contest row.
///
/// Every method either applies the whole change or leaves the model untouched.
impl contest::Model {
    pub fn can_start(&self, now: DateTime<Utc>) -> bool {
        self.status == ContestStatus::Pending && now >= self.start_time
    }

    pub fn can_stop(&self) -> bool {
        self.status == ContestStatus::Active
    }

    pub fn ensure_can_start(&self, now: DateTime<Utc>) -> Result<(), ContestError> {
        if !self.status.can_transition_to(ContestStatus::Active) {
            return Err(ContestError::IllegalTransition {
                from: self.status,
                to: ContestStatus::Active,
            });
        }
        if now < self.start_time {
            return Err(ContestError::NotStartable {
                start_time: self.start_time,
            });
        }
        Ok(())
    }

    /// Moves to `next` if the edge exists. Self-transitions are rejected.
    pub fn transition(&mut self, next: ContestStatus) -> Result<(), ContestError> {
        if !self.status.can_transition_to(next) {
            return Err(ContestError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), ContestError> {
        self.ensure_can_start(now)?;
        self.transition(ContestStatus::Active)?;
        self.updated_at = now;
        Ok(())
    }

    /// Finishes a running contest. The end time becomes `now`.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), ContestError> {
        if !self.can_stop() {
            return Err(ContestError::NotRunning(self.status));
        }
        self.transition(ContestStatus::Finished)?;
        self.end_time = now;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ContestError> {
        self.transition(ContestStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }

    /// Applies a validated change-set. Returns true if the start time moved.
    pub fn apply(
        &mut self,
        changes: ContestChangeSet,
        now: DateTime<Utc>,
    ) -> Result<bool, ContestError> {
        if changes.is_empty() {
            return Err(ContestError::EmptyChangeSet);
        }

        let mut next = self.clone();
        if let Some(title) = changes.title {
            validate_title(&title)?;
            next.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            validate_description(&description)?;
            next.description = description;
        }
        if let Some(contest_type) = changes.contest_type {
            next.contest_type = contest_type;
        }
        if let Some(max_members) = changes.max_members {
            next.max_members = max_members;
        }
        if let Some(team_size) = changes.team_size {
            next.team_size = team_size;
        }
        if let Some(point_budget) = changes.point_budget {
            next.point_budget = point_budget;
        }
        if let Some(start_time) = changes.start_time {
            next.start_time = start_time;
        }
        if let Some(end_time) = changes.end_time {
            next.end_time = end_time;
        }
        if let Some(auto_start) = changes.auto_start {
            next.auto_start = auto_start;
        }

        // Cross-field checks run against the merged values.
        validate_window(next.start_time, next.end_time)?;
        validate_counts(next.max_members, next.team_size, next.point_budget)?;

        let start_moved = next.start_time != self.start_time;
        next.updated_at = now;
        *self = next;
        Ok(start_moved)
    }
}

fn validate_title(title: &str) -> Result<(), ContestError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(ContestError::Invalid(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ContestError> {
    if description.len() > MAX_DESCRIPTION_BYTES {
        return Err(ContestError::Invalid(
            "Description must be at most 1MB".into(),
        ));
    }
    Ok(())
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ContestError> {
    if end <= start {
        return Err(ContestError::Invalid(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

fn validate_counts(max_members: i32, team_size: i32, point_budget: i32) -> Result<(), ContestError> {
    for (name, value) in [
        ("max_members", max_members),
        ("team_size", team_size),
        ("point_budget", point_budget),
    ] {
        if value < 0 {
            return Err(ContestError::Invalid(format!("{name} must be >= 0")));
        }
    }
    Ok(())
}
