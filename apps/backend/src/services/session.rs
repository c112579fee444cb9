//! AI review session orchestration.
//!
//! Drives one session across its independent steps: creation and
//! question generation, answering, bounded-concurrency evaluation, and
//! completion. Persistence and the AI provider sit behind traits so the
//! flow can be exercised without PostgreSQL or a live model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use uuid::Uuid;

use conspecto_core::{Difficulty, Evaluation, ReviewSession, SessionMode, TransitionError};

use crate::db::Database;
use crate::error::{ApiError, Result};
use crate::models::{AiReviewSession, AnswerSubmission, DbAiReviewSession, DbNote, QuestionStatus};
use crate::services::ai::{AiProvider, ProviderError};

/// Persistence contract consumed by the session service.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_note(&self, note_id: Uuid) -> Result<Option<DbNote>>;
    async fn insert_session(&self, session: &AiReviewSession) -> Result<()>;
    async fn load_session(&self, session_id: Uuid) -> Result<Option<AiReviewSession>>;
    async fn save_session(&self, session: &AiReviewSession) -> Result<()>;
}

#[async_trait]
impl SessionStore for Database {
    async fn get_note(&self, note_id: Uuid) -> Result<Option<DbNote>> {
        Database::get_note(self, note_id).await
    }

    async fn insert_session(&self, session: &AiReviewSession) -> Result<()> {
        Database::insert_session(self, &DbAiReviewSession::from_model(session)).await
    }

    async fn load_session(&self, session_id: Uuid) -> Result<Option<AiReviewSession>> {
        match Database::load_session(self, session_id).await? {
            Some(row) => Ok(Some(row.to_model()?)),
            None => Ok(None),
        }
    }

    async fn save_session(&self, session: &AiReviewSession) -> Result<()> {
        Database::save_session(self, &DbAiReviewSession::from_model(session)).await
    }
}

/// Tunables for provider interaction.
#[derive(Debug, Clone)]
pub struct SessionServiceConfig {
    /// Upper bound on any single provider call.
    pub provider_timeout: Duration,
    /// Cap on concurrent evaluation calls per session.
    pub max_concurrent_evaluations: usize,
}

impl Default for SessionServiceConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(60),
            max_concurrent_evaluations: 4,
        }
    }
}

impl SessionServiceConfig {
    /// Read tunables from `AI_PROVIDER_TIMEOUT_SECS` and
    /// `AI_MAX_CONCURRENT_EVALUATIONS`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider_timeout: std::env::var("AI_PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            max_concurrent_evaluations: std::env::var("AI_MAX_CONCURRENT_EVALUATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_evaluations),
        }
    }
}

/// Orchestrates AI review sessions over a store and a provider.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    ai: Arc<dyn AiProvider>,
    config: SessionServiceConfig,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        ai: Arc<dyn AiProvider>,
        config: SessionServiceConfig,
    ) -> Self {
        Self { store, ai, config }
    }

    /// Create a session and run question generation.
    ///
    /// The session is persisted as `pending` before the provider is
    /// contacted, then saved again as `ready_for_review` or `failed`.
    /// Generation runs exactly once per session; retrying means
    /// creating a new session.
    pub async fn request(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        mode: SessionMode,
        difficulty: Option<Difficulty>,
    ) -> Result<AiReviewSession> {
        let note = self
            .store
            .get_note(note_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Note {} not found", note_id)))?;
        if note.user_id != user_id {
            return Err(ApiError::Validation("note is not accessible".to_string()));
        }

        let mut model = AiReviewSession {
            id: Uuid::new_v4(),
            user_id,
            note_id,
            session: ReviewSession::new(mode, difficulty, Utc::now()),
        };
        self.store.insert_session(&model).await?;

        tracing::info!(session_id = %model.id, %note_id, "generating questions");
        let generated = timeout(
            self.config.provider_timeout,
            self.ai.generate_questions(&note.content, mode, difficulty),
        )
        .await;

        match generated {
            Ok(Ok(questions)) => {
                match model.session.questions_generated(questions, Utc::now()) {
                    Ok(()) => {}
                    Err(TransitionError::NoQuestionsGenerated) => {
                        tracing::warn!(session_id = %model.id, "generator returned no questions");
                        model.session.fail("generator returned no questions")?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(session_id = %model.id, error = %e, "question generation failed");
                model.session.fail(format!("question generation failed: {e}"))?;
            }
            Err(_) => {
                tracing::warn!(session_id = %model.id, "question generation timed out");
                model.session.fail("question generation timed out")?;
            }
        }

        self.store.save_session(&model).await?;
        Ok(model)
    }

    /// Load a session, side-effect-free.
    pub async fn get(&self, user_id: Uuid, session_id: Uuid) -> Result<AiReviewSession> {
        self.load_owned(user_id, session_id).await
    }

    /// `ready_for_review` -> `in_progress`.
    pub async fn start(&self, user_id: Uuid, session_id: Uuid) -> Result<AiReviewSession> {
        let mut model = self.load_owned(user_id, session_id).await?;
        model.session.begin(Utc::now())?;
        self.store.save_session(&model).await?;
        Ok(model)
    }

    /// Record a batch of answers and skips while `in_progress`.
    pub async fn submit_answers(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        answers: Vec<AnswerSubmission>,
    ) -> Result<AiReviewSession> {
        let mut model = self.load_owned(user_id, session_id).await?;
        for submission in answers {
            model
                .session
                .record_answer(submission.question_id, submission.answer)?;
        }
        self.store.save_session(&model).await?;
        Ok(model)
    }

    /// Lock answers, evaluate them, and complete the session.
    ///
    /// Answered questions are evaluated concurrently, bounded by
    /// `max_concurrent_evaluations`, each under `provider_timeout`. A
    /// single failed evaluation degrades that question to
    /// `not_answered`; the session fails only when every provider call
    /// in the step errors. Skipped questions are resolved locally
    /// without contacting the provider. A session already past
    /// `in_progress` is refused, so evaluation runs at most once.
    pub async fn evaluate(&self, user_id: Uuid, session_id: Uuid) -> Result<AiReviewSession> {
        let mut model = self.load_owned(user_id, session_id).await?;
        model.session.begin_evaluation()?;
        self.store.save_session(&model).await?;

        let targets: Vec<(Uuid, String, String)> = model
            .session
            .questions()
            .iter()
            .filter(|q| q.status == QuestionStatus::Answered)
            .map(|q| {
                (
                    q.id,
                    q.question.clone(),
                    q.answer.clone().unwrap_or_default(),
                )
            })
            .collect();

        for (id, _, _) in &targets {
            model.session.mark_evaluating(*id)?;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_evaluations));
        let mut tasks = JoinSet::new();
        for (id, question, answer) in targets.iter().cloned() {
            let ai = Arc::clone(&self.ai);
            let semaphore = Arc::clone(&semaphore);
            let provider_timeout = self.config.provider_timeout;
            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let verdict = match timeout(provider_timeout, ai.evaluate_answer(&question, &answer)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::TimedOut),
                };
                (id, verdict)
            });
        }

        let mut verdicts = Vec::with_capacity(targets.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| ApiError::Internal(format!("evaluation task panicked: {e}")))?;
            verdicts.push(outcome);
        }

        let attempted = verdicts.len();
        let errored = verdicts.iter().filter(|(_, v)| v.is_err()).count();
        if attempted > 0 && errored == attempted {
            tracing::warn!(session_id = %model.id, attempted, "evaluation step failed entirely");
            model
                .session
                .fail("answer evaluation failed: provider unreachable")?;
            self.store.save_session(&model).await?;
            return Ok(model);
        }

        for (id, verdict) in verdicts {
            match verdict {
                Ok(v) => model.session.resolve_question(id, v.evaluation, v.ai_message)?,
                Err(e) => {
                    tracing::warn!(session_id = %model.id, question_id = %id, error = %e, "evaluation failed for question");
                    model.session.resolve_question(
                        id,
                        Evaluation::NotAnswered,
                        Some(format!("evaluation failed: {e}")),
                    )?;
                }
            }
        }

        // Skipped questions are classified without a provider call.
        let skipped: Vec<Uuid> = model
            .session
            .questions()
            .iter()
            .filter(|q| !q.is_resolved())
            .map(|q| q.id)
            .collect();
        for id in skipped {
            model
                .session
                .resolve_question(id, Evaluation::NotAnswered, None)?;
        }

        model.session.complete(Utc::now())?;
        self.store.save_session(&model).await?;
        tracing::info!(session_id = %model.id, "session completed");
        Ok(model)
    }

    async fn load_owned(&self, user_id: Uuid, session_id: Uuid) -> Result<AiReviewSession> {
        let model = self
            .store
            .load_session(session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;
        if model.user_id != user_id {
            return Err(ApiError::NotFound(format!("Session {} not found", session_id)));
        }
        Ok(model)
    }
}
