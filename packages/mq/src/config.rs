/// Connection settings for the broker.
pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

impl From<&common::MqAppConfig> for MqConfig {
    fn from(config: &common::MqAppConfig) -> Self {
        Self {
            url: config.url.clone(),
            pool_size: config.pool_size,
        }
    }
}
