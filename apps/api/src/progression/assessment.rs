use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::roadmap::{AssessmentQuestion, Roadmap};
use crate::progression::commands::CommandError;

/// Minimum best score (percent) that unlocks the next module.
pub const PASSING_SCORE: u32 = 80;
pub const MAX_SCORE: u32 = 100;

/// Result of recording an attempt. `best_score` is the stored value after the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentScore {
    pub learner_id: Uuid,
    pub module_index: usize,
    pub best_score: u32,
    pub previous_best: Option<u32>,
}

impl AssessmentScore {
    pub fn improved(&self) -> bool {
        self.previous_best.map_or(true, |prev| self.best_score > prev)
    }
}

/// Outcome of grading one multiple-choice submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub correct_answers: usize,
    pub total_questions: usize,
    pub score: u32,
}

/// Stores `max(existing, raw_score)` for the learner. The stored best never decreases.
pub fn record_score(
    roadmap: &mut Roadmap,
    learner_id: Uuid,
    module_index: usize,
    raw_score: u32,
) -> Result<AssessmentScore, CommandError> {
    if module_index >= roadmap.modules.len() {
        return Err(CommandError::ModuleOutOfRange {
            index: module_index,
            count: roadmap.modules.len(),
        });
    }
    if raw_score > MAX_SCORE {
        return Err(CommandError::ScoreOutOfRange(raw_score));
    }

    let scores = roadmap.assessment_scores.entry(learner_id).or_default();
    let previous_best = scores.get(&module_index).copied();
    let best_score = previous_best.map_or(raw_score, |prev| prev.max(raw_score));
    scores.insert(module_index, best_score);

    Ok(AssessmentScore {
        learner_id,
        module_index,
        best_score,
        previous_best,
    })
}

/// False when no attempt has been recorded; use [`has_attempted`] to tell
/// "not attempted" apart from "failed".
pub fn assessment_passed(roadmap: &Roadmap, module_index: usize) -> bool {
    roadmap
        .owner_best_score(module_index)
        .is_some_and(|best| best >= PASSING_SCORE)
}

pub fn has_attempted(roadmap: &Roadmap, module_index: usize) -> bool {
    roadmap.owner_best_score(module_index).is_some()
}

/// Grades answers (option letters, case-insensitive) against the question set.
pub fn grade_submission(
    questions: &[AssessmentQuestion],
    selected_answers: &[String],
) -> Result<Grade, CommandError> {
    if questions.is_empty() {
        return Err(CommandError::NoAssessment);
    }
    if questions.len() != selected_answers.len() {
        return Err(CommandError::AnswerCountMismatch {
            expected: questions.len(),
            got: selected_answers.len(),
        });
    }

    let correct_answers = questions
        .iter()
        .zip(selected_answers)
        .filter(|(q, answer)| answer.trim().eq_ignore_ascii_case(q.correct_option.trim()))
        .count();
    let total_questions = questions.len();
    let score = ((correct_answers * 200 + total_questions) / (total_questions * 2)) as u32;

    Ok(Grade {
        correct_answers,
        total_questions,
        score,
    })
}
