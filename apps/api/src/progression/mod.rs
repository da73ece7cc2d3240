//! Progression rules for a roadmap: which resource is next, which modules are
//! unlocked, when assessments and interviews open up, and the named commands
//! that mutate a roadmap under those rules.
//!
//! Everything here is synchronous and free of I/O. The HTTP handlers (server of
//! record) and the toggle service (client side) both call into it.

pub mod assessment;
pub mod commands;
pub mod interview;
pub mod report;
pub mod resolver;

pub use assessment::{assessment_passed, grade_submission, record_score, PASSING_SCORE};
pub use commands::{CommandEffect, CommandError, IneligibleReason, RoadmapCommand};
pub use interview::{can_take_interview, interview_block_reason, InterviewBlockReason};
pub use report::{progress_report, ProgressReport};
pub use resolver::{
    can_mark_complete, can_mark_incomplete, is_module_accessible, is_module_complete,
    locate_frontier, module_progress, overall_progress,
};
