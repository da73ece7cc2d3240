pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::roadmaps::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/roadmaps",
            get(handlers::handle_list_roadmaps).post(handlers::handle_create_roadmap),
        )
        .route(
            "/api/v1/roadmaps/interview/add",
            post(handlers::handle_add_interview),
        )
        .route("/api/v1/roadmaps/:id", get(handlers::handle_get_roadmap))
        .route(
            "/api/v1/roadmaps/:id/progress",
            get(handlers::handle_get_progress),
        )
        .route(
            "/api/v1/roadmaps/:id/status",
            put(handlers::handle_update_status),
        )
        .route(
            "/api/v1/roadmaps/:id/resource/:key/toggle",
            post(handlers::handle_toggle_resource),
        )
        .route(
            "/api/v1/roadmaps/:id/:module_index/assessment/get",
            get(handlers::handle_get_assessment),
        )
        .route(
            "/api/v1/roadmaps/:id/:module_index/assessment/submit",
            post(handlers::handle_submit_assessment),
        )
        .with_state(state)
}
