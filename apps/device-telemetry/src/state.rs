use axum::extract::FromRef;
use std::sync::Arc;

use crate::devices::DeviceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
}

impl AppState {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

impl FromRef<AppState> for Arc<DeviceRegistry> {
    fn from_ref(state: &AppState) -> Arc<DeviceRegistry> {
        state.registry.clone()
    }
}
