use serde::{Deserialize, Serialize};

use crate::models::roadmap::{InterviewNum, ResourceKey, Roadmap};
use crate::progression::assessment::assessment_passed;
use crate::progression::interview::{checkpoint_module, interview_block_reason, InterviewBlockReason};
use crate::progression::resolver::{
    is_assessment_available, is_module_accessible, is_module_complete, last_completed,
    locate_frontier, module_progress, overall_progress,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleProgress {
    pub index: usize,
    pub title: String,
    pub progress: u8,
    pub completed: bool,
    pub accessible: bool,
    pub assessment_available: bool,
    pub best_score: Option<u32>,
    pub assessment_passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewStatus {
    pub interview: InterviewNum,
    pub checkpoint_module: Option<usize>,
    pub status: InterviewBlockReason,
}

/// Everything the dashboard needs to render a roadmap's state in one pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressReport {
    pub overall_progress: u8,
    pub frontier: Option<ResourceKey>,
    pub last_completed: Option<ResourceKey>,
    pub modules: Vec<ModuleProgress>,
    pub interviews: Vec<InterviewStatus>,
}

pub fn progress_report(roadmap: &Roadmap) -> ProgressReport {
    let modules = roadmap
        .modules
        .iter()
        .enumerate()
        .map(|(index, module)| ModuleProgress {
            index,
            title: module.title.clone(),
            progress: module_progress(module),
            completed: is_module_complete(module),
            accessible: is_module_accessible(roadmap, index),
            assessment_available: is_assessment_available(roadmap, index),
            best_score: roadmap.owner_best_score(index),
            assessment_passed: assessment_passed(roadmap, index),
        })
        .collect();

    let interviews = InterviewNum::ALL
        .iter()
        .map(|&interview| InterviewStatus {
            interview,
            checkpoint_module: checkpoint_module(roadmap.modules.len(), interview),
            status: interview_block_reason(roadmap, interview),
        })
        .collect();

    ProgressReport {
        overall_progress: overall_progress(roadmap),
        frontier: locate_frontier(roadmap),
        last_completed: last_completed(roadmap),
        modules,
        interviews,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete_module, pass_module, roadmap_with_shape};

    #[test]
    fn test_report_reflects_roadmap_state() {
        let mut roadmap = roadmap_with_shape(&[&[2], &[1], &[1]]);
        complete_module(&mut roadmap, 0);
        pass_module(&mut roadmap, 0);

        let report = progress_report(&roadmap);
        assert_eq!(report.overall_progress, 33);
        assert_eq!(report.frontier, Some(ResourceKey::new(1, 0, 0)));
        assert_eq!(report.last_completed, Some(ResourceKey::new(0, 0, 1)));

        let first = &report.modules[0];
        assert!(first.completed && first.assessment_passed);
        assert_eq!(first.best_score, Some(100));
        assert!(report.modules[1].accessible);
        assert!(!report.modules[2].accessible);

        assert_eq!(report.interviews[0].checkpoint_module, Some(1));
        assert_eq!(report.interviews[0].status, InterviewBlockReason::ModulesIncomplete);
    }

    #[test]
    fn test_report_serializes_keys_as_strings() {
        let roadmap = roadmap_with_shape(&[&[1]]);
        let value = serde_json::to_value(progress_report(&roadmap)).unwrap();
        assert_eq!(value["frontier"], "0-0-0");
        assert_eq!(value["interviews"][1]["interview"], 2);
    }
}
