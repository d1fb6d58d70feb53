use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AttemptId, ClientSettings, Contest, ContestId, Question, QuizLaunch, QuizResult, Submission,
    SubmittedAnswer,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;

use crate::error::BackendError;

/// Filters for a fresh question batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionQuery {
    pub category: String,
    pub difficulty: String,
    pub limit: u32,
}

impl From<&QuizLaunch> for QuestionQuery {
    fn from(launch: &QuizLaunch) -> Self {
        Self {
            category: launch.category.clone(),
            difficulty: launch.difficulty.clone(),
            limit: launch.limit,
        }
    }
}

/// Body of `POST quiz/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken: u32,
    pub category: String,
    pub difficulty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<ContestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_title: Option<String>,
}

impl SubmitRequest {
    #[must_use]
    pub fn new(launch: &QuizLaunch, submission: Submission) -> Self {
        Self {
            answers: submission.answers,
            time_taken: submission.time_taken,
            category: launch.category.clone(),
            difficulty: launch.difficulty.clone(),
            contest_id: launch.key.contest_id().cloned(),
            quiz_title: Some(launch.quiz_title.clone()),
        }
    }
}

/// HTTP contract the quiz flow consumes.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Fetch a question batch filtered by category, difficulty and limit.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` for transport failures or non-success statuses.
    async fn fetch_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, BackendError>;

    /// Submit a completed answer set and receive the scored result.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` for transport failures or non-success statuses.
    async fn submit_quiz(&self, request: &SubmitRequest) -> Result<QuizResult, BackendError>;

    /// List contests visible to the current user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` for transport failures or non-success statuses.
    async fn list_contests(&self) -> Result<Vec<Contest>, BackendError>;

    /// Fetch a previously scored attempt, e.g. for a completed contest.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` for transport failures or non-success statuses.
    async fn fetch_attempt(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError>;
}

/// Run a submission call bounded by `limit`; running out of time is a failure.
///
/// # Errors
///
/// Returns `BackendError::Timeout` when `limit` elapses, or the call's own error.
pub async fn submit_with_timeout(
    backend: &dyn QuizBackend,
    request: &SubmitRequest,
    limit: Duration,
) -> Result<QuizResult, BackendError> {
    tokio::time::timeout(limit, backend.submit_quiz(request))
        .await
        .map_err(|_| BackendError::Timeout)?
}

/// `reqwest` client for the quiz REST API.
#[derive(Clone)]
pub struct HttpQuizBackend {
    client: Client,
    settings: ClientSettings,
}

impl HttpQuizBackend {
    /// Build a client honoring the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the TLS backend cannot be initialized.
    pub fn new(settings: ClientSettings) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self { client, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.settings.api_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn ensure_success(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(BackendError::HttpStatus(response.status()))
    }
}

fn attempt_path(attempt_id: &AttemptId) -> String {
    format!("quiz/attempt/{}", attempt_id.as_str())
}

fn timed_out(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Http(err)
    }
}

#[async_trait]
impl QuizBackend for HttpQuizBackend {
    async fn fetch_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, BackendError> {
        let url = self.settings.endpoint("questions/random");
        let limit = query.limit.to_string();
        let request = self.client.get(url).query(&[
            ("category", query.category.as_str()),
            ("difficulty", query.difficulty.as_str()),
            ("limit", limit.as_str()),
        ]);

        let response = self.authorize(request).send().await.map_err(timed_out)?;
        let questions = ensure_success(response)?.json().await?;
        Ok(questions)
    }

    async fn submit_quiz(&self, request: &SubmitRequest) -> Result<QuizResult, BackendError> {
        let url = self.settings.endpoint("quiz/submit");
        let response = self
            .authorize(
                self.client
                    .post(url)
                    .timeout(self.settings.submit_timeout())
                    .json(request),
            )
            .send()
            .await
            .map_err(timed_out)?;
        let result = ensure_success(response)?.json().await?;
        Ok(result)
    }

    async fn list_contests(&self) -> Result<Vec<Contest>, BackendError> {
        let url = self.settings.endpoint("contests");
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(timed_out)?;
        let contests = ensure_success(response)?.json().await?;
        Ok(contests)
    }

    async fn fetch_attempt(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError> {
        let url = self.settings.endpoint(&attempt_path(attempt_id));
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(timed_out)?;
        let result = ensure_success(response)?.json().await?;
        Ok(result)
    }
}
