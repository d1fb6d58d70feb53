#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AttemptId, Contest, Question, QuestionId, QuizResult, QuizSnapshot, SessionKey,
};
use services::{BackendError, QuestionQuery, QuizBackend, SubmitRequest};
use storage::repository::{InMemoryRepository, SnapshotRepository, StorageError};

/// Ordered record of backend calls and snapshot deletions.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn questions(count: usize) -> Vec<Question> {
    (1..=count)
        .map(|n| {
            Question::new(
                QuestionId::new(format!("q{n}")),
                format!("Question {n}?"),
                ["A".into(), "B".into(), "C".into(), "D".into()],
            )
        })
        .collect()
}

pub struct FakeBackend {
    questions: Vec<Question>,
    contests: Vec<Contest>,
    attempts: Vec<QuizResult>,
    failures_left: AtomicUsize,
    submit_delay: Duration,
    fetch_calls: AtomicUsize,
    submitted: Mutex<Vec<SubmitRequest>>,
    journal: Journal,
}

impl FakeBackend {
    pub fn new(questions: Vec<Question>, journal: Journal) -> Self {
        Self {
            questions,
            contests: Vec::new(),
            attempts: Vec::new(),
            failures_left: AtomicUsize::new(0),
            submit_delay: Duration::ZERO,
            fetch_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            journal,
        }
    }

    /// Reject the next `count` submissions with a 503.
    pub fn failing_first(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn with_contests(mut self, contests: Vec<Contest>) -> Self {
        self.contests = contests;
        self
    }

    /// Serve `result` from `fetch_attempt` under its attempt id.
    pub fn with_attempt(mut self, result: QuizResult) -> Self {
        self.attempts.push(result);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, entry: &str) {
        self.journal.lock().unwrap().push(entry.to_string());
    }
}

#[async_trait]
impl QuizBackend for FakeBackend {
    async fn fetch_questions(&self, _query: &QuestionQuery) -> Result<Vec<Question>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.record("fetch");
        Ok(self.questions.clone())
    }

    async fn submit_quiz(&self, request: &SubmitRequest) -> Result<QuizResult, BackendError> {
        self.submitted.lock().unwrap().push(request.clone());
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            self.record("submit:err");
            return Err(BackendError::HttpStatus(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }

        self.record("submit:ok");
        let answered = request
            .answers
            .iter()
            .filter(|answer| answer.selected_answer.is_some())
            .count();
        Ok(QuizResult {
            attempt_id: Some(AttemptId::new("attempt-1")),
            score: Some(u32::try_from(answered).unwrap()),
            total_questions: Some(u32::try_from(request.answers.len()).unwrap()),
            time_taken: Some(request.time_taken),
            is_published: true,
            ..QuizResult::default()
        })
    }

    async fn list_contests(&self) -> Result<Vec<Contest>, BackendError> {
        Ok(self.contests.clone())
    }

    async fn fetch_attempt(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError> {
        self.record("attempt");
        self.attempts
            .iter()
            .find(|result| result.attempt_id.as_ref() == Some(attempt_id))
            .cloned()
            .ok_or(BackendError::HttpStatus(reqwest::StatusCode::NOT_FOUND))
    }
}

/// In-memory slot store that journals deletions.
#[derive(Clone)]
pub struct JournalingRepository {
    inner: InMemoryRepository,
    journal: Journal,
    failing_saves: Arc<AtomicUsize>,
}

impl JournalingRepository {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            journal,
            failing_saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reject the next `count` snapshot writes.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryRepository {
        &self.inner
    }

    pub fn deletions(&self) -> usize {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.as_str() == "delete")
            .count()
    }
}

#[async_trait]
impl SnapshotRepository for JournalingRepository {
    async fn load_snapshot(&self, key: &SessionKey) -> Result<Option<QuizSnapshot>, StorageError> {
        self.inner.load_snapshot(key).await
    }

    async fn save_snapshot(
        &self,
        key: &SessionKey,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError> {
        let should_fail = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StorageError::Connection("disk unavailable".into()));
        }
        self.inner.save_snapshot(key, snapshot).await
    }

    async fn delete_snapshot(&self, key: &SessionKey) -> Result<bool, StorageError> {
        self.journal.lock().unwrap().push("delete".to_string());
        self.inner.delete_snapshot(key).await
    }
}
