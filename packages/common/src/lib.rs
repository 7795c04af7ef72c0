pub mod application;
pub mod config;
pub mod contest;
pub mod error;
pub mod event;
pub mod member;

pub use application::ApplicationStatus;
pub use config::MqAppConfig;
pub use contest::{ContestStatus, ContestType};
pub use error::ParseEnumError;
pub use event::{EventPublisher, LifecycleEvent, LifecycleEventType};
pub use member::{LeaderType, MemberType};
