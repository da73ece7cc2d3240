use crate::models::roadmap::{Module, ResourceKey, Roadmap};
use crate::progression::assessment::assessment_passed;

/// First incomplete resource in global curriculum order, or `None` when every
/// resource is complete.
pub fn locate_frontier(roadmap: &Roadmap) -> Option<ResourceKey> {
    roadmap
        .resources()
        .find(|(_, resource)| !resource.completed)
        .map(|(key, _)| key)
}

/// Last completed resource in global order.
pub fn last_completed(roadmap: &Roadmap) -> Option<ResourceKey> {
    roadmap
        .resources()
        .filter(|(_, resource)| resource.completed)
        .map(|(key, _)| key)
        .last()
}

/// Only the frontier may go from incomplete to complete.
pub fn can_mark_complete(roadmap: &Roadmap, key: ResourceKey) -> bool {
    locate_frontier(roadmap) == Some(key)
}

/// A completed resource may be reverted only when nothing after it in global
/// order is complete.
pub fn can_mark_incomplete(roadmap: &Roadmap, key: ResourceKey) -> bool {
    match roadmap.resource(key) {
        Some(resource) if resource.completed => last_completed(roadmap) == Some(key),
        _ => false,
    }
}

/// Empty modules are vacuously complete.
pub fn is_module_complete(module: &Module) -> bool {
    module.resources().all(|r| r.completed)
}

/// Completed resources as a rounded percentage. An empty module reports 100.
pub fn module_progress(module: &Module) -> u8 {
    let total = module.resource_count();
    if total == 0 {
        return 100;
    }
    percent(module.completed_count(), total)
}

/// Module 0 is always open; module k needs module k-1 complete and its
/// assessment passed. Indices past the end are never accessible.
pub fn is_module_accessible(roadmap: &Roadmap, module_index: usize) -> bool {
    if module_index >= roadmap.modules.len() {
        return false;
    }
    if module_index == 0 {
        return true;
    }
    let previous = module_index - 1;
    is_module_complete(&roadmap.modules[previous]) && assessment_passed(roadmap, previous)
}

/// An assessment can be taken once its module is unlocked and fully worked through.
pub fn is_assessment_available(roadmap: &Roadmap, module_index: usize) -> bool {
    is_module_accessible(roadmap, module_index)
        && roadmap
            .module(module_index)
            .is_some_and(is_module_complete)
}

/// Completed modules over total modules; 0 for a roadmap without modules.
pub fn overall_progress(roadmap: &Roadmap) -> u8 {
    let total = roadmap.modules.len();
    if total == 0 {
        return 0;
    }
    let done = roadmap
        .modules
        .iter()
        .filter(|m| is_module_complete(m))
        .count();
    percent(done, total)
}

/// Rounds half up, like `Math.round` on the client.
fn percent(part: usize, whole: usize) -> u8 {
    ((part * 200 + whole) / (whole * 2)).min(100) as u8
}
