use std::time::Duration;

use common::MqAppConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Redis URL for the application cache. Without one, applications are
    /// kept in process memory (single node only).
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Tuning for the lifecycle engine.
#[derive(Debug, Deserialize, Clone)]
pub struct LifecycleConfig {
    /// Application TTL used once a contest's start time has passed. Default: 24h.
    #[serde(default = "default_fallback_ttl_secs")]
    pub fallback_ttl_secs: u64,
    /// Events buffered before new ones are dropped. Default: 1024.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Concurrent publisher calls. Default: 32.
    #[serde(default = "default_event_max_in_flight")]
    pub event_max_in_flight: usize,
    #[serde(default = "default_auto_start_enabled")]
    pub auto_start_enabled: bool,
    /// Seconds between auto-start sweeps. Default: 30.
    #[serde(default = "default_auto_start_scan_interval_secs")]
    pub auto_start_scan_interval_secs: u64,
}

fn default_fallback_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_event_queue_capacity() -> usize {
    1024
}
fn default_event_max_in_flight() -> usize {
    32
}
fn default_auto_start_enabled() -> bool {
    true
}
fn default_auto_start_scan_interval_secs() -> u64 {
    30
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            fallback_ttl_secs: default_fallback_ttl_secs(),
            event_queue_capacity: default_event_queue_capacity(),
            event_max_in_flight: default_event_max_in_flight(),
            auto_start_enabled: default_auto_start_enabled(),
            auto_start_scan_interval_secs: default_auto_start_scan_interval_secs(),
        }
    }
}

impl LifecycleConfig {
    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_secs)
    }

    pub fn auto_start_interval(&self) -> Duration {
        Duration::from_secs(self.auto_start_scan_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CONTEST__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CONTEST").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
