//! Server-of-record persistence.
//!
//! `AppState` holds an `Arc<dyn RoadmapStore>`, chosen at startup from config.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::roadmap::Roadmap;
use crate::progression::{CommandEffect, RoadmapCommand};

pub use memory::InMemoryRoadmapStore;
pub use postgres::PgRoadmapStore;

#[async_trait]
pub trait RoadmapStore: Send + Sync {
    async fn insert(&self, roadmap: &Roadmap) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Roadmap>, AppError>;

    /// Roadmaps where the user is the mentee or the mentor, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Roadmap>, AppError>;

    /// Applies `command` atomically against the stored roadmap and returns the
    /// updated roadmap. Nothing is persisted if the command is rejected.
    async fn apply(
        &self,
        id: Uuid,
        command: &RoadmapCommand,
    ) -> Result<(Roadmap, CommandEffect), AppError>;
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Roadmap {id} not found"))
}
