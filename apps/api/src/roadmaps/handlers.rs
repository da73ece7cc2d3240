use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::roadmap::{ResourceKey, Roadmap};
use crate::progression::resolver::is_assessment_available;
use crate::progression::{
    assessment_passed, grade_submission, locate_frontier, module_progress, overall_progress,
    progress_report, CommandEffect, ProgressReport, RoadmapCommand,
};
use crate::roadmaps::payloads::{
    AddInterviewRequest, AssessmentResponse, CreateRoadmapRequest, MessageResponse, QuestionView,
    SubmitAssessmentRequest, SubmitAssessmentResponse, ToggleRequest, ToggleResponse,
    UpdateStatusRequest, UserIdQuery,
};
use crate::state::AppState;

async fn load_roadmap(state: &AppState, id: Uuid) -> Result<Roadmap, AppError> {
    state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Roadmap {id} not found")))
}

fn require_member(roadmap: &Roadmap, user_id: Uuid) -> Result<(), AppError> {
    if roadmap.is_member(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not a member of this roadmap".to_string()))
    }
}

fn require_mentee(roadmap: &Roadmap, user_id: Uuid) -> Result<(), AppError> {
    if roadmap.mentee_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the mentee can change progress on this roadmap".to_string(),
        ))
    }
}

fn require_mentor(roadmap: &Roadmap, user_id: Uuid) -> Result<(), AppError> {
    if roadmap.mentor_id == Some(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the assigned mentor can set interview context".to_string(),
        ))
    }
}

/// POST /api/v1/roadmaps
pub async fn handle_create_roadmap(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<CreateRoadmapRequest>,
) -> Result<(StatusCode, Json<Roadmap>), AppError> {
    if params.user_id != req.mentee_id && Some(params.user_id) != req.mentor_id {
        return Err(AppError::Forbidden(
            "Roadmaps can only be created by their mentee or mentor".to_string(),
        ));
    }
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if req.duration_weeks == 0 {
        return Err(AppError::Validation(
            "duration_weeks must be at least 1".to_string(),
        ));
    }

    // A new roadmap always starts with nothing completed.
    let mut modules = req.modules;
    for resource in modules
        .iter_mut()
        .flat_map(|m| m.subtopics.iter_mut())
        .flat_map(|s| s.resources.iter_mut())
    {
        resource.completed = false;
    }

    let roadmap = Roadmap::new(
        req.mentee_id,
        req.mentor_id,
        title.to_string(),
        req.skill,
        req.duration_weeks,
        modules,
    );
    state.store.insert(&roadmap).await?;

    info!(
        "Created roadmap {} for mentee {} ({} modules)",
        roadmap.id,
        roadmap.mentee_id,
        roadmap.modules.len()
    );
    Ok((StatusCode::CREATED, Json(roadmap.redacted())))
}

/// GET /api/v1/roadmaps
pub async fn handle_list_roadmaps(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<Roadmap>>, AppError> {
    let roadmaps = state.store.list_for_user(params.user_id).await?;
    Ok(Json(roadmaps.iter().map(Roadmap::redacted).collect()))
}

/// GET /api/v1/roadmaps/:id
pub async fn handle_get_roadmap(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Roadmap>, AppError> {
    let roadmap = load_roadmap(&state, id).await?;
    require_member(&roadmap, params.user_id)?;
    Ok(Json(roadmap.redacted()))
}

/// GET /api/v1/roadmaps/:id/progress
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProgressReport>, AppError> {
    let roadmap = load_roadmap(&state, id).await?;
    require_member(&roadmap, params.user_id)?;
    Ok(Json(progress_report(&roadmap)))
}

/// POST /api/v1/roadmaps/:id/resource/:key/toggle
pub async fn handle_toggle_resource(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let key: ResourceKey = key.parse()?;
    let roadmap = load_roadmap(&state, id).await?;
    require_mentee(&roadmap, params.user_id)?;

    let (roadmap, effect) = state
        .store
        .apply(id, &RoadmapCommand::toggle(key, req.completed))
        .await?;
    let changed = matches!(effect, CommandEffect::ResourceUpdated { .. });
    if changed {
        info!("Roadmap {id}: resource {key} -> completed={}", req.completed);
    }

    let module_progress = roadmap
        .module(key.module)
        .map(module_progress)
        .unwrap_or_default();
    Ok(Json(ToggleResponse {
        key,
        completed: req.completed,
        changed,
        frontier: locate_frontier(&roadmap),
        module_progress,
        overall_progress: overall_progress(&roadmap),
    }))
}

/// GET /api/v1/roadmaps/:id/:module_index/assessment/get
pub async fn handle_get_assessment(
    State(state): State<AppState>,
    Path((id, module_index)): Path<(Uuid, usize)>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<AssessmentResponse>, AppError> {
    let roadmap = load_roadmap(&state, id).await?;
    require_member(&roadmap, params.user_id)?;
    let module = roadmap
        .module(module_index)
        .ok_or_else(|| AppError::NotFound(format!("Module {module_index} not found")))?;

    Ok(Json(AssessmentResponse {
        questions: module.assessment.iter().map(QuestionView::from).collect(),
    }))
}

/// POST /api/v1/roadmaps/:id/:module_index/assessment/submit
pub async fn handle_submit_assessment(
    State(state): State<AppState>,
    Path((id, module_index)): Path<(Uuid, usize)>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<Json<SubmitAssessmentResponse>, AppError> {
    let roadmap = load_roadmap(&state, id).await?;
    require_mentee(&roadmap, params.user_id)?;
    let module = roadmap
        .module(module_index)
        .ok_or_else(|| AppError::NotFound(format!("Module {module_index} not found")))?;
    if !is_assessment_available(&roadmap, module_index) {
        return Err(AppError::Conflict(format!(
            "Assessment for module {module_index} opens once the module is unlocked and all its resources are complete"
        )));
    }

    let grade = grade_submission(&module.assessment, &req.selected_answers)?;
    let command = RoadmapCommand::RecordScore {
        learner_id: params.user_id,
        module_index,
        score: grade.score,
    };
    let (roadmap, effect) = state.store.apply(id, &command).await?;
    let best_score = match effect {
        CommandEffect::ScoreRecorded(score) => score.best_score,
        _ => grade.score,
    };

    info!(
        "Roadmap {id}: module {module_index} assessment scored {} (best {best_score})",
        grade.score
    );
    Ok(Json(SubmitAssessmentResponse {
        current_score: grade.score,
        best_score,
        correct_answers: grade.correct_answers,
        total_questions: grade.total_questions,
        passed: assessment_passed(&roadmap, module_index),
    }))
}

/// POST /api/v1/roadmaps/interview/add
pub async fn handle_add_interview(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<AddInterviewRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let roadmap = load_roadmap(&state, req.roadmap_id).await?;
    require_mentor(&roadmap, params.user_id)?;

    let command = RoadmapCommand::SetInterviewContext {
        interview: req.interview_num,
        context: req.context,
    };
    state.store.apply(req.roadmap_id, &command).await?;

    info!(
        "Roadmap {}: interview {} context set",
        req.roadmap_id, req.interview_num
    );
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Interview theme added successfully".to_string(),
        }),
    ))
}

/// PUT /api/v1/roadmaps/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Roadmap>, AppError> {
    let roadmap = load_roadmap(&state, id).await?;
    if roadmap.mentor_id != Some(params.user_id) {
        return Err(AppError::Forbidden(
            "Only the assigned mentor can update this roadmap".to_string(),
        ));
    }

    let command = RoadmapCommand::SetStatus { status: req.status };
    let (updated, _) = state.store.apply(id, &command).await?;

    info!("Roadmap {id}: status set to {:?}", req.status);
    Ok(Json(updated.redacted()))
}
