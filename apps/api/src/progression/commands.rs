use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::roadmap::{InterviewNum, ResourceKey, Roadmap, RoadmapStatus};
use crate::progression::assessment::{record_score, AssessmentScore};
use crate::progression::resolver::{can_mark_complete, can_mark_incomplete, is_module_accessible};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    /// Only the first incomplete resource may be completed.
    NotFrontier,
    /// The resource's module is still locked behind the previous assessment.
    ModuleLocked,
    AlreadyComplete,
    NotComplete,
    /// A resource later in the curriculum is still marked complete.
    LaterWorkCompleted,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IneligibleReason::NotFrontier => "complete the earlier resources first",
            IneligibleReason::ModuleLocked => {
                "finish the previous module and pass its assessment to unlock this module"
            }
            IneligibleReason::AlreadyComplete => "resource is already complete",
            IneligibleReason::NotComplete => "resource is not complete",
            IneligibleReason::LaterWorkCompleted => {
                "uncheck later resources before unchecking this one"
            }
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Resource {0} does not exist")]
    UnknownResource(ResourceKey),

    #[error("Module {index} does not exist (roadmap has {count} modules)")]
    ModuleOutOfRange { index: usize, count: usize },

    #[error("Cannot change resource {key}: {reason}")]
    IneligibleTransition {
        key: ResourceKey,
        reason: IneligibleReason,
    },

    #[error("Score {0} is outside 0-100")]
    ScoreOutOfRange(u32),

    #[error("Interview context must not be empty")]
    EmptyInterviewContext,

    #[error("Module has no assessment")]
    NoAssessment,

    #[error("Expected {expected} answers, got {got}")]
    AnswerCountMismatch { expected: usize, got: usize },
}

/// The named mutations a roadmap accepts. Every write, local or on the server of
/// record, goes through [`RoadmapCommand::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RoadmapCommand {
    MarkComplete {
        key: ResourceKey,
    },
    MarkIncomplete {
        key: ResourceKey,
    },
    RecordScore {
        learner_id: Uuid,
        module_index: usize,
        score: u32,
    },
    SetInterviewContext {
        interview: InterviewNum,
        context: String,
    },
    /// Lifecycle change by the mentor. Never derived from progress.
    SetStatus {
        status: RoadmapStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum CommandEffect {
    ResourceUpdated { key: ResourceKey, completed: bool },
    /// The resource already had the requested value.
    Unchanged { key: ResourceKey, completed: bool },
    ScoreRecorded(AssessmentScore),
    InterviewContextSet { interview: InterviewNum },
    StatusSet { status: RoadmapStatus },
}

impl RoadmapCommand {
    pub fn toggle(key: ResourceKey, completed: bool) -> Self {
        if completed {
            RoadmapCommand::MarkComplete { key }
        } else {
            RoadmapCommand::MarkIncomplete { key }
        }
    }

    /// Validates the command against the progression rules and applies it.
    /// Nothing is mutated when an error is returned.
    ///
    /// Toggling a resource to the value it already holds is a no-op
    /// ([`CommandEffect::Unchanged`]), so retried writes are safe.
    pub fn apply(&self, roadmap: &mut Roadmap) -> Result<CommandEffect, CommandError> {
        let effect = match self {
            RoadmapCommand::MarkComplete { key } => set_completed(roadmap, *key, true)?,
            RoadmapCommand::MarkIncomplete { key } => set_completed(roadmap, *key, false)?,
            RoadmapCommand::RecordScore {
                learner_id,
                module_index,
                score,
            } => CommandEffect::ScoreRecorded(record_score(
                roadmap,
                *learner_id,
                *module_index,
                *score,
            )?),
            RoadmapCommand::SetInterviewContext { interview, context } => {
                let context = context.trim();
                if context.is_empty() {
                    return Err(CommandError::EmptyInterviewContext);
                }
                *roadmap.interview_context_mut(*interview) = Some(context.to_string());
                CommandEffect::InterviewContextSet {
                    interview: *interview,
                }
            }
            RoadmapCommand::SetStatus { status } => {
                roadmap.status = *status;
                CommandEffect::StatusSet { status: *status }
            }
        };

        if !matches!(effect, CommandEffect::Unchanged { .. }) {
            roadmap.updated_at = Utc::now();
        }
        Ok(effect)
    }
}

/// Checks whether `key` may move to `completed`, without applying anything.
pub fn check_transition(
    roadmap: &Roadmap,
    key: ResourceKey,
    completed: bool,
) -> Result<(), CommandError> {
    let resource = roadmap
        .resource(key)
        .ok_or(CommandError::UnknownResource(key))?;

    let ineligible = |reason| Err(CommandError::IneligibleTransition { key, reason });

    if completed {
        if resource.completed {
            return ineligible(IneligibleReason::AlreadyComplete);
        }
        if !can_mark_complete(roadmap, key) {
            return ineligible(IneligibleReason::NotFrontier);
        }
        if !is_module_accessible(roadmap, key.module) {
            return ineligible(IneligibleReason::ModuleLocked);
        }
    } else {
        if !resource.completed {
            return ineligible(IneligibleReason::NotComplete);
        }
        if !can_mark_incomplete(roadmap, key) {
            return ineligible(IneligibleReason::LaterWorkCompleted);
        }
    }
    Ok(())
}

fn set_completed(
    roadmap: &mut Roadmap,
    key: ResourceKey,
    completed: bool,
) -> Result<CommandEffect, CommandError> {
    let current = roadmap
        .resource(key)
        .ok_or(CommandError::UnknownResource(key))?
        .completed;
    if current == completed {
        return Ok(CommandEffect::Unchanged { key, completed });
    }

    check_transition(roadmap, key, completed)?;
    if let Some(resource) = roadmap.resource_mut(key) {
        resource.completed = completed;
    }
    Ok(CommandEffect::ResourceUpdated { key, completed })
}
