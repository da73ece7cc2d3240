use serde::{Deserialize, Serialize};

use crate::models::roadmap::{InterviewNum, Roadmap};
use crate::progression::assessment::assessment_passed;
use crate::progression::resolver::is_module_complete;

/// Why an interview can or cannot be started, for actionable guidance in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewBlockReason {
    ModulesIncomplete,
    ContextMissing,
    Ready,
}

/// Index of the last module that must be finished before the interview.
/// Interview 1 sits at the halfway point (rounded up), interview 2 at the end.
pub fn checkpoint_module(total_modules: usize, interview: InterviewNum) -> Option<usize> {
    if total_modules == 0 {
        return None;
    }
    Some(match interview {
        InterviewNum::First => total_modules.div_ceil(2) - 1,
        InterviewNum::Second => total_modules - 1,
    })
}

/// Module requirements are checked before the mentor-provided context.
pub fn interview_block_reason(roadmap: &Roadmap, interview: InterviewNum) -> InterviewBlockReason {
    let Some(checkpoint) = checkpoint_module(roadmap.modules.len(), interview) else {
        return InterviewBlockReason::ModulesIncomplete;
    };

    let modules_ready = roadmap.modules[..=checkpoint]
        .iter()
        .enumerate()
        .all(|(index, module)| is_module_complete(module) && assessment_passed(roadmap, index));
    if !modules_ready {
        return InterviewBlockReason::ModulesIncomplete;
    }

    match roadmap.interview_context(interview) {
        Some(context) if !context.trim().is_empty() => InterviewBlockReason::Ready,
        _ => InterviewBlockReason::ContextMissing,
    }
}

pub fn can_take_interview(roadmap: &Roadmap, interview: InterviewNum) -> bool {
    interview_block_reason(roadmap, interview) == InterviewBlockReason::Ready
}
