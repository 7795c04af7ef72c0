pub mod contest;

pub use contest::{ContestChangeSet, ContestDraft, ContestError};
