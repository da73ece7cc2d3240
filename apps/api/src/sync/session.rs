use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::RoadmapRemote;
use crate::models::roadmap::{InterviewNum, ResourceKey, Roadmap};
use crate::progression::{
    interview_block_reason, progress_report, record_score, CommandError, InterviewBlockReason,
    ProgressReport, RoadmapCommand,
};
use crate::roadmaps::payloads::{QuestionView, SubmitAssessmentResponse};
use crate::sync::error::SyncError;
use crate::sync::toggle::{ToggleOutcome, ToggleService, ToggleState};

/// A learner's working copy of one roadmap, kept in step with the server.
pub struct LearnerSession {
    roadmap_id: Uuid,
    roadmap: Arc<RwLock<Roadmap>>,
    remote: Arc<dyn RoadmapRemote>,
    toggles: ToggleService,
    timeout: Duration,
}

impl LearnerSession {
    pub async fn open(
        remote: Arc<dyn RoadmapRemote>,
        roadmap_id: Uuid,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let roadmap = remote.fetch_roadmap(roadmap_id).await?;
        info!(
            "Opened roadmap {roadmap_id} with {} modules",
            roadmap.modules.len()
        );

        let roadmap = Arc::new(RwLock::new(roadmap));
        let toggles = ToggleService::new(roadmap.clone(), remote.clone(), timeout);
        Ok(Self {
            roadmap_id,
            roadmap,
            remote,
            toggles,
            timeout,
        })
    }

    /// Replaces the local snapshot with the server's copy.
    ///
    /// Refused while a toggle is pending. Toggles requested while the fetch is
    /// in flight are refused with `ToggleInProgress` until it settles.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let _refreshing = self.toggles.begin_refresh()?;
        let fresh = self.remote.fetch_roadmap(self.roadmap_id).await?;
        *self.roadmap.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        debug!("Refreshed roadmap {}", self.roadmap_id);
        Ok(())
    }

    pub fn snapshot(&self) -> Roadmap {
        self.roadmap
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn progress_report(&self) -> ProgressReport {
        progress_report(&self.roadmap.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn interview_block_reason(&self, interview: InterviewNum) -> InterviewBlockReason {
        interview_block_reason(
            &self.roadmap.read().unwrap_or_else(PoisonError::into_inner),
            interview,
        )
    }

    pub async fn toggle(&self, key: ResourceKey, completed: bool) -> Result<ToggleOutcome, SyncError> {
        self.toggles.toggle(key, completed).await
    }

    pub fn toggle_state(&self, key: ResourceKey) -> ToggleState {
        self.toggles.state_of(key)
    }

    pub async fn fetch_assessment(&self, module_index: usize) -> Result<Vec<QuestionView>, SyncError> {
        self.check_module(module_index)?;
        self.with_timeout(self.remote.fetch_assessment(self.roadmap_id, module_index))
            .await
    }

    /// Submits answers for grading. The local best score is merged only after the
    /// server accepts the attempt; a failed submission leaves it untouched.
    pub async fn submit_assessment(
        &self,
        module_index: usize,
        selected_answers: &[String],
    ) -> Result<SubmitAssessmentResponse, SyncError> {
        self.check_module(module_index)?;
        let response = self
            .with_timeout(
                self.remote
                    .submit_assessment(self.roadmap_id, module_index, selected_answers),
            )
            .await
            .map_err(|e| {
                warn!("Assessment submission for module {module_index} failed: {e}");
                e
            })?;

        let mut roadmap = self.roadmap.write().unwrap_or_else(PoisonError::into_inner);
        let mentee = roadmap.mentee_id;
        record_score(&mut roadmap, mentee, module_index, response.best_score)?;
        info!(
            "Module {module_index} assessment scored {} (best {})",
            response.current_score, response.best_score
        );
        Ok(response)
    }

    /// Mentor-side write of an interview's context. Blank context is rejected locally.
    pub async fn set_interview_context(
        &self,
        interview: InterviewNum,
        context: &str,
    ) -> Result<(), SyncError> {
        let context = context.trim();
        if context.is_empty() {
            return Err(CommandError::EmptyInterviewContext.into());
        }
        self.with_timeout(
            self.remote
                .set_interview_context(self.roadmap_id, interview, context),
        )
        .await?;

        let command = RoadmapCommand::SetInterviewContext {
            interview,
            context: context.to_string(),
        };
        command.apply(&mut self.roadmap.write().unwrap_or_else(PoisonError::into_inner))?;
        Ok(())
    }

    fn check_module(&self, module_index: usize) -> Result<(), SyncError> {
        let roadmap = self.roadmap.read().unwrap_or_else(PoisonError::into_inner);
        if module_index >= roadmap.modules.len() {
            return Err(CommandError::ModuleOutOfRange {
                index: module_index,
                count: roadmap.modules.len(),
            }
            .into());
        }
        Ok(())
    }

    async fn with_timeout<T, F>(&self, call: F) -> Result<T, SyncError>
    where
        F: std::future::Future<Output = Result<T, crate::client::RemoteError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::NetworkFailure(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Semaphore;

    use super::*;
    use crate::fixtures::{complete_module, pass_module, roadmap_with_shape};
    use crate::sync::mock::{MockRemote, Reply};

    async fn open(remote: &Arc<MockRemote>, roadmap: &Roadmap) -> LearnerSession {
        LearnerSession::open(remote.clone(), roadmap.id, Duration::from_secs(5))
            .await
            .unwrap()
    }

    fn response(current: u32, best: u32) -> SubmitAssessmentResponse {
        SubmitAssessmentResponse {
            current_score: current,
            best_score: best,
            correct_answers: (current / 20) as usize,
            total_questions: 5,
            passed: best >= 80,
        }
    }

    #[tokio::test]
    async fn test_open_unknown_roadmap_is_stale() {
        let remote: Arc<dyn RoadmapRemote> = Arc::new(MockRemote::default());
        let err = LearnerSession::open(remote, Uuid::new_v4(), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(err.requires_refresh());
    }

    #[tokio::test]
    async fn test_passing_assessment_unlocks_next_module() {
        let mut roadmap = roadmap_with_shape(&[&[1], &[1]]);
        complete_module(&mut roadmap, 0);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        remote.set_submission(response(80, 80));
        let session = open(&remote, &roadmap).await;
        assert!(!session.progress_report().modules[1].accessible);

        let answers = vec!["A".to_string(); 5];
        session.submit_assessment(0, &answers).await.unwrap();

        assert_eq!(session.snapshot().owner_best_score(0), Some(80));
        assert!(session.progress_report().modules[1].accessible);
        session.toggle(ResourceKey::new(1, 0, 0), true).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_best_score() {
        let mut roadmap = roadmap_with_shape(&[&[1], &[1]]);
        complete_module(&mut roadmap, 0);
        roadmap.assessment_scores.entry(roadmap.mentee_id).or_default().insert(0, 60);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        remote.push(Reply::Status(503));
        let session = open(&remote, &roadmap).await;

        let err = session
            .submit_assessment(0, &["A".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NetworkFailure(_)));
        assert_eq!(session.snapshot().owner_best_score(0), Some(60));
    }

    #[tokio::test]
    async fn test_lower_attempt_does_not_lower_best() {
        let mut roadmap = roadmap_with_shape(&[&[1]]);
        complete_module(&mut roadmap, 0);
        pass_module(&mut roadmap, 0);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        // The server reports its stored best alongside the weaker attempt.
        remote.set_submission(response(40, 100));
        let session = open(&remote, &roadmap).await;

        let result = session.submit_assessment(0, &vec!["B".to_string(); 5]).await.unwrap();
        assert_eq!(result.current_score, 40);
        assert_eq!(session.snapshot().owner_best_score(0), Some(100));
    }

    #[tokio::test]
    async fn test_assessment_for_missing_module_is_stale() {
        let roadmap = roadmap_with_shape(&[&[1]]);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        let session = open(&remote, &roadmap).await;

        assert!(session.fetch_assessment(3).await.unwrap_err().requires_refresh());
        assert_eq!(session.fetch_assessment(0).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_interview_context_applied_after_server_accepts() {
        let mut roadmap = roadmap_with_shape(&[&[1], &[1]]);
        complete_module(&mut roadmap, 0);
        pass_module(&mut roadmap, 0);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        let session = open(&remote, &roadmap).await;
        assert_eq!(
            session.interview_block_reason(InterviewNum::First),
            InterviewBlockReason::ContextMissing
        );

        remote.push(Reply::Status(403));
        let err = session
            .set_interview_context(InterviewNum::First, "System design")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ServerError { status: Some(403), .. }));
        assert!(session.snapshot().interview_context(InterviewNum::First).is_none());

        session
            .set_interview_context(InterviewNum::First, "  System design  ")
            .await
            .unwrap();
        assert_eq!(
            session.interview_block_reason(InterviewNum::First),
            InterviewBlockReason::Ready
        );
        assert_eq!(
            remote.contexts(),
            vec![(InterviewNum::First, "System design".to_string())]
        );

        let blank = session.set_interview_context(InterviewNum::Second, "   ").await;
        assert!(matches!(blank, Err(SyncError::ServerError { status: None, .. })));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_server_changes() {
        let roadmap = roadmap_with_shape(&[&[2]]);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        let session = open(&remote, &roadmap).await;

        let mut server_copy = roadmap.clone();
        crate::fixtures::complete(&mut server_copy, ResourceKey::new(0, 0, 0));
        remote.set_roadmap(server_copy);

        session.refresh().await.unwrap();
        assert_eq!(
            session.progress_report().frontier,
            Some(ResourceKey::new(0, 0, 1))
        );
    }

    #[tokio::test]
    async fn test_toggle_refused_while_refresh_in_flight() {
        let roadmap = roadmap_with_shape(&[&[2]]);
        let remote = Arc::new(MockRemote::serving(roadmap.clone()));
        let session = Arc::new(open(&remote, &roadmap).await);
        let gate = Arc::new(Semaphore::new(0));
        remote.gate_fetches(gate.clone());
        let key = ResourceKey::new(0, 0, 0);

        let refreshing = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });
        while remote.fetch_count() < 2 {
            tokio::task::yield_now().await;
        }

        let err = session.toggle(key, true).await.unwrap_err();
        assert_eq!(err, SyncError::ToggleInProgress(key));
        assert!(err.is_recoverable());
        assert!(remote.toggle_calls().is_empty());
        assert_eq!(session.toggle_state(key), ToggleState::Idle);

        gate.add_permits(1);
        refreshing.await.unwrap().unwrap();

        // Once the refresh lands, the committed toggle stays in the snapshot.
        session.toggle(key, true).await.unwrap();
        assert_eq!(session.toggle_state(key), ToggleState::Committed);
        assert!(session.snapshot().resource(key).unwrap().completed);
    }

    #[tokio::test]
    async fn test_refresh_refused_while_toggle_pending() {
        let roadmap = roadmap_with_shape(&[&[2]]);
        let gate = Arc::new(Semaphore::new(0));
        let remote = Arc::new(MockRemote::gated(gate.clone()));
        remote.set_roadmap(roadmap.clone());
        let session = Arc::new(open(&remote, &roadmap).await);
        let key = ResourceKey::new(0, 0, 0);

        let toggling = tokio::spawn({
            let session = session.clone();
            async move { session.toggle(key, true).await }
        });
        while session.toggle_state(key) != ToggleState::Pending {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            session.refresh().await.unwrap_err(),
            SyncError::ToggleInProgress(key)
        );
        assert_eq!(remote.fetch_count(), 1);

        gate.add_permits(1);
        toggling.await.unwrap().unwrap();
        session.refresh().await.unwrap();
    }
}
