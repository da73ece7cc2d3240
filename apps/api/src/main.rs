use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roadmap_api::config::Config;
use roadmap_api::db::create_pool;
use roadmap_api::routes::build_router;
use roadmap_api::state::AppState;
use roadmap_api::store::{InMemoryRoadmapStore, PgRoadmapStore, RoadmapStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roadmap API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn RoadmapStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            info!("Using Postgres roadmap store");
            Arc::new(PgRoadmapStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; roadmaps are kept in memory and lost on restart");
            Arc::new(InMemoryRoadmapStore::new())
        }
    };

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
