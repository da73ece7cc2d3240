use std::sync::Arc;

use crate::config::Config;
use crate::store::RoadmapStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Server of record. Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn RoadmapStore>,
    pub config: Config,
}
