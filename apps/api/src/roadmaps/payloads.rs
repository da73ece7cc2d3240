//! Request and response bodies for the roadmap endpoints. Shared by the server
//! handlers and the HTTP client so both sides agree on the wire format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::roadmap::{AssessmentQuestion, InterviewNum, Module, ResourceKey, RoadmapStatus};

#[derive(Debug, Deserialize, Serialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// Curriculum produced by roadmap generation, ready to be stored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateRoadmapRequest {
    pub mentee_id: Uuid,
    pub mentor_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub skill: String,
    pub duration_weeks: u32,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToggleRequest {
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToggleResponse {
    pub key: ResourceKey,
    pub completed: bool,
    /// False when the resource already had the requested value.
    pub changed: bool,
    pub frontier: Option<ResourceKey>,
    pub module_progress: u8,
    pub overall_progress: u8,
}

/// A question as shown to the learner: no answer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QuestionView {
    pub question: String,
    pub options: BTreeMap<String, String>,
}

impl From<&AssessmentQuestion> for QuestionView {
    fn from(q: &AssessmentQuestion) -> Self {
        Self {
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssessmentResponse {
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitAssessmentRequest {
    pub selected_answers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitAssessmentResponse {
    pub current_score: u32,
    pub best_score: u32,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddInterviewRequest {
    pub roadmap_id: Uuid,
    pub interview_num: InterviewNum,
    pub context: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateStatusRequest {
    pub status: RoadmapStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
