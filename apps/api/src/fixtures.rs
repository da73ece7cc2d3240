//! Roadmap builders shared by the unit tests.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::models::roadmap::{
    AssessmentQuestion, Module, Resource, ResourceKey, ResourceKind, Roadmap, Subtopic,
};

pub fn question(correct: &str) -> AssessmentQuestion {
    let options = ["A", "B", "C", "D"]
        .iter()
        .map(|letter| (letter.to_string(), format!("Option {letter}")))
        .collect::<BTreeMap<_, _>>();
    AssessmentQuestion {
        question: format!("Which option is {correct}?"),
        options,
        correct_option: correct.to_string(),
    }
}

/// Builds a roadmap where `shape[m][s]` is the number of resources in subtopic `s`
/// of module `m`. Every module gets a five-question assessment whose answers are all "A".
pub fn roadmap_with_shape(shape: &[&[usize]]) -> Roadmap {
    let modules = shape
        .iter()
        .enumerate()
        .map(|(m, subtopics)| Module {
            title: format!("Module {m}"),
            objective: format!("Objective {m}"),
            subtopics: subtopics
                .iter()
                .enumerate()
                .map(|(s, &count)| Subtopic {
                    title: format!("Subtopic {m}.{s}"),
                    resources: (0..count)
                        .map(|r| Resource {
                            title: format!("Resource {m}.{s}.{r}"),
                            kind: ResourceKind::Video,
                            url: Some(format!("https://example.com/{m}/{s}/{r}")),
                            completed: false,
                        })
                        .collect(),
                })
                .collect(),
            assessment: (0..5).map(|_| question("A")).collect(),
        })
        .collect();

    Roadmap::new(
        Uuid::new_v4(),
        Some(Uuid::new_v4()),
        "Backend engineering".to_string(),
        "rust".to_string(),
        8,
        modules,
    )
}

/// Flips a resource without any eligibility check.
pub fn complete(roadmap: &mut Roadmap, key: ResourceKey) {
    roadmap
        .resource_mut(key)
        .unwrap_or_else(|| panic!("no resource {key}"))
        .completed = true;
}

/// Completes every resource up to and including `last`.
pub fn complete_through(roadmap: &mut Roadmap, last: ResourceKey) {
    let keys: Vec<_> = roadmap
        .resources()
        .map(|(key, _)| key)
        .filter(|key| *key <= last)
        .collect();
    for key in keys {
        complete(roadmap, key);
    }
}

pub fn complete_module(roadmap: &mut Roadmap, module_index: usize) {
    for subtopic in &mut roadmap.modules[module_index].subtopics {
        for resource in &mut subtopic.resources {
            resource.completed = true;
        }
    }
}

pub fn pass_module(roadmap: &mut Roadmap, module_index: usize) {
    let mentee = roadmap.mentee_id;
    roadmap
        .assessment_scores
        .entry(mentee)
        .or_default()
        .insert(module_index, 100);
}
