use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::store::{ApplicationStore, MemoryApplicationStore, RedisApplicationStore, StoreError};

/// Builds the application store: Redis when a URL is configured, otherwise the
/// in-process store.
pub async fn init_application_store(
    config: &CacheConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn ApplicationStore>, StoreError> {
    match config.url.as_deref() {
        Some(url) => {
            let store = RedisApplicationStore::connect(url).await?;
            info!("Application cache connected to Redis");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No cache URL configured; applications are kept in process memory");
            Ok(Arc::new(MemoryApplicationStore::new(clock)))
        }
    }
}
