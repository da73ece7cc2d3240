use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapStatus {
    Draft,
    #[default]
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Video,
    Article,
    Exercise,
    Youtube,
    Coursera,
    #[serde(other)]
    Other,
}

/// A single learning item. `completed` is the only field that changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtopic {
    pub title: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A multiple-choice question attached to a module. `options` is keyed by letter ("A".."D").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentQuestion {
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub correct_option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assessment: Vec<AssessmentQuestion>,
}

impl Module {
    /// All resources of the module in curriculum order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> + '_ {
        self.subtopics.iter().flat_map(|s| s.resources.iter())
    }

    pub fn resource_count(&self) -> usize {
        self.subtopics.iter().map(|s| s.resources.len()).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.resources().filter(|r| r.completed).count()
    }
}

/// Which of the two milestone interviews is meant. Serialized as `1` or `2`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum InterviewNum {
    First,
    Second,
}

impl InterviewNum {
    pub const ALL: [InterviewNum; 2] = [InterviewNum::First, InterviewNum::Second];
}

impl TryFrom<u8> for InterviewNum {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(InterviewNum::First),
            2 => Ok(InterviewNum::Second),
            other => Err(format!("interview_num must be 1 or 2, got {other}")),
        }
    }
}

impl From<InterviewNum> for u8 {
    fn from(value: InterviewNum) -> Self {
        match value {
            InterviewNum::First => 1,
            InterviewNum::Second => 2,
        }
    }
}

impl fmt::Display for InterviewNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Stable address of a resource: (module, subtopic, resource) indices.
///
/// The derived ordering is lexicographic, which is exactly the global curriculum
/// order. The external string form is `"{module}-{subtopic}-{resource}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    pub module: usize,
    pub subtopic: usize,
    pub resource: usize,
}

impl ResourceKey {
    pub const fn new(module: usize, subtopic: usize, resource: usize) -> Self {
        Self {
            module,
            subtopic,
            resource,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid resource key '{0}': expected '<module>-<subtopic>-<resource>'")]
pub struct KeyParseError(pub String);

impl FromStr for ResourceKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        let [m, st, r] = parts.as_slice() else {
            return Err(KeyParseError(s.to_string()));
        };
        let parse = |p: &str| {
            // usize::from_str accepts a leading '+', which would break the round trip
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(KeyParseError(s.to_string()));
            }
            p.parse::<usize>().map_err(|_| KeyParseError(s.to_string()))
        };
        Ok(ResourceKey::new(parse(*m)?, parse(*st)?, parse(*r)?))
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.module, self.subtopic, self.resource)
    }
}

/// A learner's curriculum. Structure is fixed at creation; only resource completion,
/// assessment scores and the interview contexts change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Roadmap {
    pub id: Uuid,
    pub mentee_id: Uuid,
    #[serde(default)]
    pub mentor_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub skill: String,
    pub duration_weeks: u32,
    #[serde(default)]
    pub status: RoadmapStatus,
    pub modules: Vec<Module>,
    #[serde(default)]
    pub interview_context_1: Option<String>,
    #[serde(default)]
    pub interview_context_2: Option<String>,
    /// learner id -> module index -> best score (percent)
    #[serde(default)]
    pub assessment_scores: BTreeMap<Uuid, BTreeMap<usize, u32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Roadmap {
    pub fn new(
        mentee_id: Uuid,
        mentor_id: Option<Uuid>,
        title: String,
        skill: String,
        duration_weeks: u32,
        modules: Vec<Module>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            mentee_id,
            mentor_id,
            title,
            skill,
            duration_weeks,
            status: RoadmapStatus::Active,
            modules,
            interview_context_1: None,
            interview_context_2: None,
            assessment_scores: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub fn resource(&self, key: ResourceKey) -> Option<&Resource> {
        self.modules
            .get(key.module)?
            .subtopics
            .get(key.subtopic)?
            .resources
            .get(key.resource)
    }

    pub fn resource_mut(&mut self, key: ResourceKey) -> Option<&mut Resource> {
        self.modules
            .get_mut(key.module)?
            .subtopics
            .get_mut(key.subtopic)?
            .resources
            .get_mut(key.resource)
    }

    /// Every resource paired with its key, in global curriculum order.
    pub fn resources(&self) -> impl Iterator<Item = (ResourceKey, &Resource)> + '_ {
        self.modules.iter().enumerate().flat_map(|(m, module)| {
            module.subtopics.iter().enumerate().flat_map(move |(s, subtopic)| {
                subtopic
                    .resources
                    .iter()
                    .enumerate()
                    .map(move |(r, resource)| (ResourceKey::new(m, s, r), resource))
            })
        })
    }

    pub fn best_score(&self, learner_id: Uuid, module_index: usize) -> Option<u32> {
        self.assessment_scores
            .get(&learner_id)
            .and_then(|scores| scores.get(&module_index))
            .copied()
    }

    /// Best score of the roadmap's owning learner.
    pub fn owner_best_score(&self, module_index: usize) -> Option<u32> {
        self.best_score(self.mentee_id, module_index)
    }

    pub fn interview_context(&self, interview: InterviewNum) -> Option<&str> {
        match interview {
            InterviewNum::First => self.interview_context_1.as_deref(),
            InterviewNum::Second => self.interview_context_2.as_deref(),
        }
    }

    pub(crate) fn interview_context_mut(&mut self, interview: InterviewNum) -> &mut Option<String> {
        match interview {
            InterviewNum::First => &mut self.interview_context_1,
            InterviewNum::Second => &mut self.interview_context_2,
        }
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.mentee_id == user_id || self.mentor_id == Some(user_id)
    }

    /// Copy safe to hand to clients: assessment answers are stripped.
    pub fn redacted(&self) -> Roadmap {
        let mut copy = self.clone();
        for module in &mut copy.modules {
            module.assessment.clear();
        }
        copy
    }
}

/// Row in the `roadmaps` table. The roadmap itself is stored as a JSONB document.
#[derive(Debug, Clone, FromRow)]
pub struct RoadmapRow {
    pub id: Uuid,
    pub mentee_id: Uuid,
    pub mentor_id: Option<Uuid>,
    pub document: Json<Roadmap>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RoadmapRow> for Roadmap {
    fn from(row: RoadmapRow) -> Self {
        row.document.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::roadmap_with_shape;

    #[test]
    fn test_key_display_and_parse() {
        let key = ResourceKey::new(2, 0, 11);
        assert_eq!(key.to_string(), "2-0-11");
        assert_eq!("2-0-11".parse::<ResourceKey>(), Ok(key));
    }

    #[test]
    fn test_key_rejects_malformed_input() {
        for bad in ["", "1-2", "1-2-3-4", "a-1-2", "1--2", "+1-2-3", "-1-2-3"] {
            assert!(bad.parse::<ResourceKey>().is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn test_key_ordering_is_curriculum_order() {
        let mut keys = vec![
            ResourceKey::new(1, 0, 0),
            ResourceKey::new(0, 1, 0),
            ResourceKey::new(0, 0, 2),
        ];
        keys.sort();
        assert_eq!(keys[0], ResourceKey::new(0, 0, 2));
        assert_eq!(keys[2], ResourceKey::new(1, 0, 0));
    }

    #[test]
    fn test_resources_flatten_in_global_order() {
        let roadmap = roadmap_with_shape(&[&[2, 0, 1], &[1]]);
        let keys: Vec<_> = roadmap.resources().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["0-0-0", "0-0-1", "0-2-0", "1-0-0"]);
    }

    #[test]
    fn test_unknown_resource_type_decodes_as_other() {
        let json = r#"{"title": "Docs", "type": "podcast", "completed": false}"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.kind, ResourceKind::Other);
        assert!(resource.url.is_none());
    }

    #[test]
    fn test_interview_num_wire_format() {
        assert_eq!(serde_json::to_string(&InterviewNum::Second).unwrap(), "2");
        assert!(serde_json::from_str::<InterviewNum>("3").is_err());
    }

    #[test]
    fn test_scores_survive_json_document() {
        let mut roadmap = roadmap_with_shape(&[&[1]]);
        roadmap
            .assessment_scores
            .entry(roadmap.mentee_id)
            .or_default()
            .insert(0, 85);
        let json = serde_json::to_string(&roadmap).unwrap();
        let back: Roadmap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.owner_best_score(0), Some(85));
    }

    #[test]
    fn test_redacted_strips_answers() {
        let roadmap = roadmap_with_shape(&[&[1]]);
        assert!(!roadmap.modules[0].assessment.is_empty());
        assert!(roadmap.redacted().modules[0].assessment.is_empty());
    }
}
