pub mod application;
pub mod contest;
pub mod member;
