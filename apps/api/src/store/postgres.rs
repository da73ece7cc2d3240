use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::roadmap::{Roadmap, RoadmapRow};
use crate::progression::{CommandEffect, RoadmapCommand};
use crate::store::{not_found, RoadmapStore};

/// Roadmaps stored as JSONB documents, one row each.
#[derive(Clone)]
pub struct PgRoadmapStore {
    pool: PgPool,
}

impl PgRoadmapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoadmapStore for PgRoadmapStore {
    async fn insert(&self, roadmap: &Roadmap) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO roadmaps (id, mentee_id, mentor_id, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(roadmap.id)
        .bind(roadmap.mentee_id)
        .bind(roadmap.mentor_id)
        .bind(Json(roadmap))
        .bind(roadmap.created_at)
        .bind(roadmap.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Roadmap>, AppError> {
        let row: Option<RoadmapRow> = sqlx::query_as("SELECT * FROM roadmaps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Roadmap::from))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Roadmap>, AppError> {
        let rows: Vec<RoadmapRow> = sqlx::query_as(
            "SELECT * FROM roadmaps WHERE mentee_id = $1 OR mentor_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Roadmap::from).collect())
    }

    async fn apply(
        &self,
        id: Uuid,
        command: &RoadmapCommand,
    ) -> Result<(Roadmap, CommandEffect), AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent commands on the same roadmap.
        let row: Option<RoadmapRow> =
            sqlx::query_as("SELECT * FROM roadmaps WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut roadmap = row.map(Roadmap::from).ok_or_else(|| not_found(id))?;

        // Dropping `tx` on a rejected command rolls the transaction back.
        let effect = command.apply(&mut roadmap)?;

        if !matches!(effect, CommandEffect::Unchanged { .. }) {
            sqlx::query("UPDATE roadmaps SET document = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(Json(&roadmap))
                .bind(roadmap.updated_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("Applied {command:?} to roadmap {id}");
        Ok((roadmap, effect))
    }
}
