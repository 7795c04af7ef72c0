//! Cache key namespace for contest applications.
//!
//! Every key of a contest is reachable from that contest's three indices, so
//! bulk operations never scan the keyspace.

pub fn application(contest_id: i32, user_id: i32) -> String {
    format!("contest:{contest_id}:application:{user_id}")
}

pub fn pending_index(contest_id: i32) -> String {
    format!("contest:{contest_id}:applications:pending")
}

pub fn accepted_index(contest_id: i32) -> String {
    format!("contest:{contest_id}:applications:accepted")
}

pub fn rejected_index(contest_id: i32) -> String {
    format!("contest:{contest_id}:applications:rejected")
}

/// Reverse index of contests a user has applied to. Shared across contests.
pub fn user_applications(user_id: i32) -> String {
    format!("user:{user_id}:applications")
}

/// The three per-contest index keys.
pub fn contest_indices(contest_id: i32) -> [String; 3] {
    [
        pending_index(contest_id),
        accepted_index(contest_id),
        rejected_index(contest_id),
    ]
}
