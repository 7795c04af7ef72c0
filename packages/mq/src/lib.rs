pub mod config;
pub mod error;
pub mod models;
pub mod publisher;

pub use config::MqConfig;
pub use error::MqError;
pub use models::{MqQueue, init_mq};
pub use publisher::MqEventPublisher;
