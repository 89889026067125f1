use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::schemas::exam::{
    AttemptSummary, ExamListing, SaveAnswerRequest, StartExamResponse, StudentProgressResponse,
    SubmitExamRequest, SubmitExamResponse,
};
use crate::schemas::user::CurrentUser;
use crate::schemas::ErrorResponse;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("exam service answered {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },
    #[error("exam service unreachable: {0}")]
    Transport(String),
    #[error("exam service returned an unreadable body: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Human-readable message supplied by the server, if any.
    pub(crate) fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::Rejected { detail, .. } => detail.as_deref(),
            ServiceError::Transport(_) | ServiceError::Decode(_) => None,
        }
    }

    pub(crate) fn detail_or(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

/// Calls the exam session issues against the Exam Service. All calls act on
/// behalf of the identity the service already authenticated.
#[async_trait]
pub(crate) trait ExamService: Send + Sync {
    async fn current_user(&self) -> Result<CurrentUser, ServiceError>;

    async fn list_exams(&self) -> Result<Vec<ExamListing>, ServiceError>;

    async fn student_attempts(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttemptSummary>, ServiceError>;

    async fn start_or_resume(&self, exam_id: &str) -> Result<StartExamResponse, ServiceError>;

    async fn save_answer(
        &self,
        exam_id: &str,
        request: &SaveAnswerRequest,
    ) -> Result<(), ServiceError>;

    async fn submit(
        &self,
        exam_id: &str,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpExamService {
    client: Client,
    base_url: String,
    access_token: String,
}

impl HttpExamService {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.api().connect_timeout())
            .timeout(settings.api().request_timeout())
            .build()
            .context("Failed to build exam service HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.api().base_url().to_string(),
            access_token: settings.api().access_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = ensure_success(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw_body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&raw_body)
        .ok()
        .and_then(|body| body.message());

    Err(ServiceError::Rejected { status: status.as_u16(), detail })
}

#[async_trait]
impl ExamService for HttpExamService {
    async fn current_user(&self) -> Result<CurrentUser, ServiceError> {
        self.send_json(self.request(Method::GET, "/me")).await
    }

    async fn list_exams(&self) -> Result<Vec<ExamListing>, ServiceError> {
        self.send_json(self.request(Method::GET, "/exams")).await
    }

    async fn student_attempts(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttemptSummary>, ServiceError> {
        let path = format!("/students/{student_id}/progress");
        let progress: StudentProgressResponse =
            self.send_json(self.request(Method::GET, &path)).await?;
        Ok(progress.attempts)
    }

    async fn start_or_resume(&self, exam_id: &str) -> Result<StartExamResponse, ServiceError> {
        let path = format!("/exams/{exam_id}/start");
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn save_answer(
        &self,
        exam_id: &str,
        request: &SaveAnswerRequest,
    ) -> Result<(), ServiceError> {
        let path = format!("/exams/{exam_id}/save-answer");
        let response = self.request(Method::POST, &path).json(request).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn submit(
        &self,
        exam_id: &str,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, ServiceError> {
        let path = format!("/exams/{exam_id}/submit");
        self.send_json(self.request(Method::POST, &path).json(request)).await
    }
}
