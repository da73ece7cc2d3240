use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::roadmap::Roadmap;
use crate::progression::{CommandEffect, RoadmapCommand};
use crate::store::{not_found, RoadmapStore};

/// Process-local store for development and tests.
#[derive(Default)]
pub struct InMemoryRoadmapStore {
    roadmaps: RwLock<HashMap<Uuid, Roadmap>>,
}

impl InMemoryRoadmapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoadmapStore for InMemoryRoadmapStore {
    async fn insert(&self, roadmap: &Roadmap) -> Result<(), AppError> {
        let mut roadmaps = self.roadmaps.write().unwrap_or_else(PoisonError::into_inner);
        if roadmaps.contains_key(&roadmap.id) {
            return Err(AppError::Validation(format!(
                "Roadmap {} already exists",
                roadmap.id
            )));
        }
        roadmaps.insert(roadmap.id, roadmap.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Roadmap>, AppError> {
        let roadmaps = self.roadmaps.read().unwrap_or_else(PoisonError::into_inner);
        Ok(roadmaps.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Roadmap>, AppError> {
        let roadmaps = self.roadmaps.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<Roadmap> = roadmaps
            .values()
            .filter(|r| r.is_member(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn apply(
        &self,
        id: Uuid,
        command: &RoadmapCommand,
    ) -> Result<(Roadmap, CommandEffect), AppError> {
        let mut roadmaps = self.roadmaps.write().unwrap_or_else(PoisonError::into_inner);
        let roadmap = roadmaps.get_mut(&id).ok_or_else(|| not_found(id))?;
        let effect = command.apply(roadmap)?;
        Ok((roadmap.clone(), effect))
    }
}
