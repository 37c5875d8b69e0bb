use std::sync::Arc;

use crate::api::ApiClient;
use crate::flows::FlowCatalog;
use crate::services::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<FlowCatalog>,
    pub sessions: SessionStore,
    pub api: ApiClient,
    pub api_base_url: String,
    pub public_base_url: String,
}

impl AppState {
    pub fn new(catalog: FlowCatalog, api: ApiClient, public_base_url: String) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions: SessionStore::new(),
            api_base_url: api.base_url().to_string(),
            api,
            public_base_url,
        }
    }
}
