//! HTTP client for the roadmap server of record.
//!
//! The toggle service and `LearnerSession` only see the `RoadmapRemote` trait, so
//! tests can swap in a scripted remote without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::roadmap::{InterviewNum, ResourceKey, Roadmap};
use crate::roadmaps::payloads::{
    AddInterviewRequest, AssessmentResponse, QuestionView, SubmitAssessmentRequest,
    SubmitAssessmentResponse, ToggleRequest,
};

const API_PREFIX: &str = "/api/v1/roadmaps";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The server-of-record operations the client side depends on.
#[async_trait]
pub trait RoadmapRemote: Send + Sync {
    async fn fetch_roadmap(&self, roadmap_id: Uuid) -> Result<Roadmap, RemoteError>;

    async fn toggle_resource(
        &self,
        roadmap_id: Uuid,
        key: ResourceKey,
        completed: bool,
    ) -> Result<(), RemoteError>;

    async fn fetch_assessment(
        &self,
        roadmap_id: Uuid,
        module_index: usize,
    ) -> Result<Vec<QuestionView>, RemoteError>;

    async fn submit_assessment(
        &self,
        roadmap_id: Uuid,
        module_index: usize,
        selected_answers: &[String],
    ) -> Result<SubmitAssessmentResponse, RemoteError>;

    async fn set_interview_context(
        &self,
        roadmap_id: Uuid,
        interview: InterviewNum,
        context: &str,
    ) -> Result<(), RemoteError>;
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// reqwest-backed [`RoadmapRemote`]. `user_id` identifies the caller on every request.
#[derive(Clone)]
pub struct RoadmapClient {
    client: Client,
    base_url: String,
    user_id: Uuid,
}

impl RoadmapClient {
    pub fn new(
        base_url: impl Into<String>,
        user_id: Uuid,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            user_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn with_user(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("user_id", self.user_id)])
    }

    /// Sends once and decodes a JSON body. Non-2xx statuses become `RemoteError::Api`.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.with_user(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Read-only GETs are safe to retry on transport errors and 5xx.
    async fn get_with_retry<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        let mut last_error: Option<RemoteError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms
                let delay = Duration::from_millis(250 * (1 << (attempt - 1)));
                warn!(
                    "GET {url} attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_json(self.client.get(url)).await {
                Ok(value) => return Ok(value),
                Err(RemoteError::Api { status, message }) if status < 500 => {
                    return Err(RemoteError::Api { status, message });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or(RemoteError::Api {
            status: 503,
            message: format!("gave up after {MAX_RETRIES} attempts"),
        }))
    }
}

#[async_trait]
impl RoadmapRemote for RoadmapClient {
    async fn fetch_roadmap(&self, roadmap_id: Uuid) -> Result<Roadmap, RemoteError> {
        let roadmap: Roadmap = self.get_with_retry(&self.url(&format!("/{roadmap_id}"))).await?;
        debug!(
            "Fetched roadmap {roadmap_id} ({} modules)",
            roadmap.modules.len()
        );
        Ok(roadmap)
    }

    async fn toggle_resource(
        &self,
        roadmap_id: Uuid,
        key: ResourceKey,
        completed: bool,
    ) -> Result<(), RemoteError> {
        // Never retried: the caller owns rollback and the single-flight rule.
        let url = self.url(&format!("/{roadmap_id}/resource/{key}/toggle"));
        let _: serde_json::Value = self
            .send_json(self.client.post(url).json(&ToggleRequest { completed }))
            .await?;
        Ok(())
    }

    async fn fetch_assessment(
        &self,
        roadmap_id: Uuid,
        module_index: usize,
    ) -> Result<Vec<QuestionView>, RemoteError> {
        let url = self.url(&format!("/{roadmap_id}/{module_index}/assessment/get"));
        let response: AssessmentResponse = self.get_with_retry(&url).await?;
        Ok(response.questions)
    }

    async fn submit_assessment(
        &self,
        roadmap_id: Uuid,
        module_index: usize,
        selected_answers: &[String],
    ) -> Result<SubmitAssessmentResponse, RemoteError> {
        let url = self.url(&format!("/{roadmap_id}/{module_index}/assessment/submit"));
        let body = SubmitAssessmentRequest {
            selected_answers: selected_answers.to_vec(),
        };
        self.send_json(self.client.post(url).json(&body)).await
    }

    async fn set_interview_context(
        &self,
        roadmap_id: Uuid,
        interview: InterviewNum,
        context: &str,
    ) -> Result<(), RemoteError> {
        let body = AddInterviewRequest {
            roadmap_id,
            interview_num: interview,
            context: context.to_string(),
        };
        let _: serde_json::Value = self
            .send_json(self.client.post(self.url("/interview/add")).json(&body))
            .await?;
        Ok(())
    }
}
