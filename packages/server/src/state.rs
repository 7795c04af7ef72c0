use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::service::LifecycleService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<LifecycleService>,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
