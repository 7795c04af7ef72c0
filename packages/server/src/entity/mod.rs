pub mod contest;
pub mod contest_member;
pub mod user;
