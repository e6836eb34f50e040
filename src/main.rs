use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use doctrail::{
    config::AppConfig,
    render::RenderPipeline,
    routes,
    state::AppState,
    storage::{FileStore, LocalFileStore},
    store::EntityStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    info!(
        data_dir = %config.data_dir.display(),
        uploads_dir = %config.uploads_dir.display(),
        pdf_dir = %config.pdf_dir.display(),
        render_timeout_secs = config.render_timeout_secs,
        "loaded configuration"
    );

    let store = Arc::new(EntityStore::open(&config.data_dir).await?);
    if config.seed_demo_data && store.seed_if_empty().await? {
        info!("seeded demo users and departments");
    }

    let uploads: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&config.uploads_dir).await?);
    let artifacts: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&config.pdf_dir).await?);
    let renderer = Arc::new(RenderPipeline::new(Duration::from_secs(
        config.render_timeout_secs,
    )));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(store, uploads, artifacts, renderer, config);
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "doctrail listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
