use std::sync::Arc;

use crate::{config::AppConfig, render::RenderPipeline, storage::FileStore, store::EntityStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EntityStore>,
    pub uploads: Arc<dyn FileStore>,
    pub artifacts: Arc<dyn FileStore>,
    pub renderer: Arc<RenderPipeline>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<EntityStore>,
        uploads: Arc<dyn FileStore>,
        artifacts: Arc<dyn FileStore>,
        renderer: Arc<RenderPipeline>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            uploads,
            artifacts,
            renderer,
            config: Arc::new(config),
        }
    }
}
