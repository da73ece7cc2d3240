//! Scripted [`RoadmapRemote`] for sync tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::client::{RemoteError, RoadmapRemote};
use crate::models::roadmap::{InterviewNum, ResourceKey, Roadmap};
use crate::roadmaps::payloads::{QuestionView, SubmitAssessmentResponse};

pub enum Reply {
    Ok,
    Status(u16),
    Hang,
}

#[derive(Default)]
pub struct MockRemote {
    roadmap: Mutex<Option<Roadmap>>,
    replies: Mutex<VecDeque<Reply>>,
    toggles: Mutex<Vec<(ResourceKey, bool)>>,
    submission: Mutex<Option<SubmitAssessmentResponse>>,
    contexts: Mutex<Vec<(InterviewNum, String)>>,
    gate: Option<Arc<Semaphore>>,
    fetch_gate: Mutex<Option<Arc<Semaphore>>>,
    fetches: AtomicUsize,
}

impl MockRemote {
    /// Every toggle waits for a permit before replying.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn serving(roadmap: Roadmap) -> Self {
        Self {
            roadmap: Mutex::new(Some(roadmap)),
            ..Self::default()
        }
    }

    /// Queues the reply for the next write. Writes default to `Reply::Ok`.
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn set_roadmap(&self, roadmap: Roadmap) {
        *self.roadmap.lock().unwrap() = Some(roadmap);
    }

    pub fn set_submission(&self, response: SubmitAssessmentResponse) {
        *self.submission.lock().unwrap() = Some(response);
    }

    /// Later roadmap fetches wait for a permit before replying.
    pub fn gate_fetches(&self, gate: Arc<Semaphore>) {
        *self.fetch_gate.lock().unwrap() = Some(gate);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> Vec<(ResourceKey, bool)> {
        self.toggles.lock().unwrap().clone()
    }

    pub fn contexts(&self) -> Vec<(InterviewNum, String)> {
        self.contexts.lock().unwrap().clone()
    }

    async fn next_reply(&self) -> Result<(), RemoteError> {
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Ok);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        match reply {
            Reply::Ok => Ok(()),
            Reply::Status(status) => Err(RemoteError::Api {
                status,
                message: format!("scripted {status}"),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl RoadmapRemote for MockRemote {
    async fn fetch_roadmap(&self, _roadmap_id: Uuid) -> Result<Roadmap, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.fetch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        self.roadmap
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Api {
                status: 404,
                message: "Roadmap not found".to_string(),
            })
    }

    async fn toggle_resource(
        &self,
        _roadmap_id: Uuid,
        key: ResourceKey,
        completed: bool,
    ) -> Result<(), RemoteError> {
        self.toggles.lock().unwrap().push((key, completed));
        self.next_reply().await
    }

    async fn fetch_assessment(
        &self,
        roadmap_id: Uuid,
        module_index: usize,
    ) -> Result<Vec<QuestionView>, RemoteError> {
        let roadmap = self.fetch_roadmap(roadmap_id).await?;
        let module = roadmap.module(module_index).ok_or_else(|| RemoteError::Api {
            status: 404,
            message: format!("Module {module_index} not found"),
        })?;
        Ok(module.assessment.iter().map(QuestionView::from).collect())
    }

    async fn submit_assessment(
        &self,
        _roadmap_id: Uuid,
        _module_index: usize,
        _selected_answers: &[String],
    ) -> Result<SubmitAssessmentResponse, RemoteError> {
        self.next_reply().await?;
        self.submission
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Api {
                status: 500,
                message: "no scripted submission".to_string(),
            })
    }

    async fn set_interview_context(
        &self,
        _roadmap_id: Uuid,
        interview: InterviewNum,
        context: &str,
    ) -> Result<(), RemoteError> {
        self.next_reply().await?;
        self.contexts
            .lock()
            .unwrap()
            .push((interview, context.to_string()));
        Ok(())
    }
}
