//! Common test utilities for session flow tests.
//!
//! Provides an in-memory `SessionStore` and scripted `AiProvider`
//! implementations, so the orchestration can be exercised without
//! PostgreSQL or a live model. The in-memory store persists sessions
//! through the same row conversion used for PostgreSQL, so the
//! serialization path is covered as well.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use conspecto_backend::error::Result;
use conspecto_backend::models::{
    AiReviewSession, DbAiReviewSession, DbNote, Difficulty, Evaluation, GeneratedQuestion,
    QuestionType, SessionMode,
};
use conspecto_backend::services::ai::{AiProvider, AnswerEvaluation, ProviderError};
use conspecto_backend::services::session::{SessionService, SessionServiceConfig, SessionStore};

/// In-memory store backing the session service in tests.
#[derive(Default)]
pub struct InMemoryStore {
    notes: Mutex<HashMap<Uuid, DbNote>>,
    sessions: Mutex<HashMap<Uuid, DbAiReviewSession>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a note and return its ID.
    pub fn add_note(&self, user_id: Uuid, content: &str) -> Uuid {
        let id = Uuid::new_v4();
        let note = DbNote {
            id,
            user_id,
            folder_id: None,
            title: "Test note".to_string(),
            content: content.to_string(),
            repetition: 0,
            interval_days: 0,
            ease_factor: 2.5,
            next_review: None,
            last_review: None,
            history: Json(Vec::new()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.notes.lock().unwrap().insert(id, note);
        id
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_note(&self, note_id: Uuid) -> Result<Option<DbNote>> {
        Ok(self.notes.lock().unwrap().get(&note_id).cloned())
    }

    async fn insert_session(&self, session: &AiReviewSession) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, DbAiReviewSession::from_model(session));
        Ok(())
    }

    async fn load_session(&self, session_id: Uuid) -> Result<Option<AiReviewSession>> {
        match self.sessions.lock().unwrap().get(&session_id) {
            Some(row) => Ok(Some(row.to_model()?)),
            None => Ok(None),
        }
    }

    async fn save_session(&self, session: &AiReviewSession) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, DbAiReviewSession::from_model(session));
        Ok(())
    }
}

/// Scripted provider: generates a fixed number of questions and grades
/// answers containing the word "correct" as correct.
pub struct ScriptedProvider {
    pub question_count: usize,
    pub generate_calls: AtomicUsize,
    pub evaluate_calls: AtomicUsize,
    /// Question texts whose evaluation should fail.
    pub failing_questions: Vec<String>,
}

impl ScriptedProvider {
    pub fn new(question_count: usize) -> Self {
        Self {
            question_count,
            generate_calls: AtomicUsize::new(0),
            evaluate_calls: AtomicUsize::new(0),
            failing_questions: Vec::new(),
        }
    }

    pub fn failing_on(question_count: usize, failing: &[&str]) -> Self {
        Self {
            failing_questions: failing.iter().map(|s| s.to_string()).collect(),
            ..Self::new(question_count)
        }
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn generate_questions(
        &self,
        _note_content: &str,
        _mode: SessionMode,
        _difficulty: Option<Difficulty>,
    ) -> std::result::Result<Vec<GeneratedQuestion>, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.question_count)
            .map(|i| GeneratedQuestion::new(QuestionType::OpenEnded, format!("Question {i}?")))
            .collect())
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> std::result::Result<AnswerEvaluation, ProviderError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_questions.iter().any(|q| q == question) {
            return Err(ProviderError::MalformedResponse("not json".to_string()));
        }
        let evaluation = if answer.contains("correct") {
            Evaluation::Correct
        } else {
            Evaluation::Incorrect
        };
        Ok(AnswerEvaluation {
            evaluation,
            ai_message: Some(format!("graded: {question}")),
        })
    }
}

/// Provider whose generation always errors.
pub struct FailingGenerator;

#[async_trait]
impl AiProvider for FailingGenerator {
    async fn generate_questions(
        &self,
        _note_content: &str,
        _mode: SessionMode,
        _difficulty: Option<Difficulty>,
    ) -> std::result::Result<Vec<GeneratedQuestion>, ProviderError> {
        Err(ProviderError::Api {
            status: 500,
            message: "model overloaded".to_string(),
        })
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        _answer: &str,
    ) -> std::result::Result<AnswerEvaluation, ProviderError> {
        Err(ProviderError::Api {
            status: 500,
            message: "model overloaded".to_string(),
        })
    }
}

/// Provider that returns an empty question set.
pub struct EmptyGenerator;

#[async_trait]
impl AiProvider for EmptyGenerator {
    async fn generate_questions(
        &self,
        _note_content: &str,
        _mode: SessionMode,
        _difficulty: Option<Difficulty>,
    ) -> std::result::Result<Vec<GeneratedQuestion>, ProviderError> {
        Ok(Vec::new())
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        _answer: &str,
    ) -> std::result::Result<AnswerEvaluation, ProviderError> {
        unreachable!("no questions to evaluate")
    }
}

/// Provider that stalls longer than any test timeout.
pub struct SlowProvider {
    pub delay: Duration,
}

#[async_trait]
impl AiProvider for SlowProvider {
    async fn generate_questions(
        &self,
        _note_content: &str,
        _mode: SessionMode,
        _difficulty: Option<Difficulty>,
    ) -> std::result::Result<Vec<GeneratedQuestion>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![GeneratedQuestion::new(
            QuestionType::OpenEnded,
            "Too late?",
        )])
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        _answer: &str,
    ) -> std::result::Result<AnswerEvaluation, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(AnswerEvaluation {
            evaluation: Evaluation::Correct,
            ai_message: None,
        })
    }
}

/// Build a service over the given store and provider with test timeouts.
pub fn service(store: Arc<InMemoryStore>, ai: Arc<dyn AiProvider>) -> SessionService {
    SessionService::new(
        store,
        ai,
        SessionServiceConfig {
            provider_timeout: Duration::from_millis(250),
            max_concurrent_evaluations: 2,
        },
    )
}
