//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;

// Re-export shared types from conspecto-core
pub use conspecto_core::types::{
    Difficulty, Evaluation, GeneratedQuestion, Quality, QuestionStatus, QuestionType,
    ReviewHistoryItem, ReviewState, SessionMode, SessionResult, SessionStatus,
};
use conspecto_core::{Phase, ReviewSession};

// === Database Entity Types ===

/// Registered user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub token: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Note stored in PostgreSQL, carrying its own scheduling state
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbNote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub repetition: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
    pub history: Json<Vec<ReviewHistoryItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Folder stored in PostgreSQL, reviewable like a note
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbFolder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub repetition: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
    pub history: Json<Vec<ReviewHistoryItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Drill question owned by one user, optionally tied to a note
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbQuestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub note_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub repetition: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
    pub history: Json<Vec<ReviewHistoryItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scheduling columns shared by notes, folders, and questions.
pub trait HasReviewState {
    fn review_columns(&self) -> (i32, i32, f64, Option<DateTime<Utc>>, Option<DateTime<Utc>>, &[ReviewHistoryItem]);

    /// Convert row columns to the core scheduling state.
    fn to_review_state(&self) -> ReviewState {
        let (repetition, interval_days, ease_factor, next_review, last_review, history) =
            self.review_columns();
        ReviewState {
            repetition: repetition.max(0) as u32,
            interval_days: interval_days.max(0) as u32,
            ease_factor,
            next_review,
            last_review,
            history: history.to_vec(),
        }
    }
}

impl HasReviewState for DbNote {
    fn review_columns(&self) -> (i32, i32, f64, Option<DateTime<Utc>>, Option<DateTime<Utc>>, &[ReviewHistoryItem]) {
        (
            self.repetition,
            self.interval_days,
            self.ease_factor,
            self.next_review,
            self.last_review,
            &self.history.0,
        )
    }
}

impl HasReviewState for DbFolder {
    fn review_columns(&self) -> (i32, i32, f64, Option<DateTime<Utc>>, Option<DateTime<Utc>>, &[ReviewHistoryItem]) {
        (
            self.repetition,
            self.interval_days,
            self.ease_factor,
            self.next_review,
            self.last_review,
            &self.history.0,
        )
    }
}

impl HasReviewState for DbQuestion {
    fn review_columns(&self) -> (i32, i32, f64, Option<DateTime<Utc>>, Option<DateTime<Utc>>, &[ReviewHistoryItem]) {
        (
            self.repetition,
            self.interval_days,
            self.ease_factor,
            self.next_review,
            self.last_review,
            &self.history.0,
        )
    }
}

// === AI Review Session ===

/// AI review session with identity attached to the core state machine.
#[derive(Debug, Clone)]
pub struct AiReviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub note_id: Uuid,
    pub session: ReviewSession,
}

/// AI review session row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbAiReviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub note_id: Uuid,
    pub status: String,
    pub mode: String,
    pub difficulty: Option<String>,
    pub questions: Option<Json<Vec<GeneratedQuestion>>>,
    pub result: Option<Json<SessionResult>>,
    pub error_message: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub questions_generated_at: Option<DateTime<Utc>>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DbAiReviewSession {
    /// Flatten a session model into row columns.
    pub fn from_model(model: &AiReviewSession) -> Self {
        let session = &model.session;
        let questions = session.questions();
        Self {
            id: model.id,
            user_id: model.user_id,
            note_id: model.note_id,
            status: session.status().as_str().to_string(),
            mode: session.mode.as_str().to_string(),
            difficulty: session.difficulty.map(|d| d.as_str().to_string()),
            questions: if questions.is_empty() {
                None
            } else {
                Some(Json(questions.to_vec()))
            },
            result: session.result().map(|r| Json(*r)),
            error_message: session.error_message().map(|m| m.to_string()),
            requested_at: session.requested_at,
            questions_generated_at: session.questions_generated_at(),
            session_started_at: session.session_started_at(),
            completed_at: session.completed_at(),
        }
    }

    /// Rebuild the typed state machine from row columns.
    ///
    /// A row whose columns do not add up to a valid phase (e.g.
    /// `completed` without a result) is treated as corrupt.
    pub fn to_model(&self) -> Result<AiReviewSession, ApiError> {
        let status = SessionStatus::from_str(&self.status)
            .ok_or_else(|| self.corrupt(format!("unknown status '{}'", self.status)))?;
        let mode = SessionMode::from_str(&self.mode)
            .ok_or_else(|| self.corrupt(format!("unknown mode '{}'", self.mode)))?;
        let difficulty = match &self.difficulty {
            Some(d) => Some(
                Difficulty::from_str(d)
                    .ok_or_else(|| self.corrupt(format!("unknown difficulty '{}'", d)))?,
            ),
            None => None,
        };

        let questions = || -> Result<Vec<GeneratedQuestion>, ApiError> {
            Ok(self
                .questions
                .as_ref()
                .ok_or_else(|| self.corrupt("missing questions"))?
                .0
                .clone())
        };
        let generated_at = || -> Result<DateTime<Utc>, ApiError> {
            self.questions_generated_at
                .ok_or_else(|| self.corrupt("missing questions_generated_at"))
        };
        let started_at = || -> Result<DateTime<Utc>, ApiError> {
            self.session_started_at
                .ok_or_else(|| self.corrupt("missing session_started_at"))
        };

        let phase = match status {
            SessionStatus::Pending => Phase::Pending,
            SessionStatus::ReadyForReview => Phase::ReadyForReview {
                questions: questions()?,
                generated_at: generated_at()?,
            },
            SessionStatus::InProgress => Phase::InProgress {
                questions: questions()?,
                generated_at: generated_at()?,
                started_at: started_at()?,
            },
            SessionStatus::EvaluatingAnswers => Phase::EvaluatingAnswers {
                questions: questions()?,
                generated_at: generated_at()?,
                started_at: started_at()?,
            },
            SessionStatus::Completed => Phase::Completed {
                questions: questions()?,
                generated_at: generated_at()?,
                started_at: started_at()?,
                completed_at: self
                    .completed_at
                    .ok_or_else(|| self.corrupt("missing completed_at"))?,
                result: self
                    .result
                    .as_ref()
                    .map(|r| r.0)
                    .ok_or_else(|| self.corrupt("missing result"))?,
            },
            SessionStatus::Failed => Phase::Failed {
                questions: self
                    .questions
                    .as_ref()
                    .map(|q| q.0.clone())
                    .unwrap_or_default(),
                generated_at: self.questions_generated_at,
                started_at: self.session_started_at,
                error_message: self
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
        };

        Ok(AiReviewSession {
            id: self.id,
            user_id: self.user_id,
            note_id: self.note_id,
            session: ReviewSession {
                mode,
                difficulty,
                requested_at: self.requested_at,
                phase,
            },
        })
    }

    fn corrupt(&self, detail: impl std::fmt::Display) -> ApiError {
        ApiError::Internal(format!("corrupt session row {}: {}", self.id, detail))
    }
}

// === API Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatusResponse {
    pub user_id: Uuid,
    pub last_seen_at: DateTime<Utc>,
}

// Content types

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub folder_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub id: Uuid,
    pub folder_id: Option<Uuid>,
    pub title: String,
    pub next_review: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderResponse {
    pub id: Uuid,
    pub name: String,
    pub next_review: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateQuestionRequest {
    pub note_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
}

// Manual review types

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReviewRequest {
    pub quality: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReviewResponse {
    pub repetition: u32,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub next_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
    pub history_length: usize,
}

impl SubmitReviewResponse {
    pub fn from_state(state: &ReviewState) -> Self {
        Self {
            repetition: state.repetition,
            interval_days: state.interval_days,
            ease_factor: state.ease_factor,
            next_review: state.next_review,
            last_review: state.last_review,
            history_length: state.history.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionListQuery {
    pub note_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub note_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub repetition: u32,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub next_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
}

impl QuestionResponse {
    pub fn from_row(row: &DbQuestion) -> Self {
        let state = row.to_review_state();
        Self {
            id: row.id,
            note_id: row.note_id,
            question: row.question.clone(),
            answer: row.answer.clone(),
            repetition: state.repetition,
            interval_days: state.interval_days,
            ease_factor: state.ease_factor,
            next_review: state.next_review,
            last_review: state.last_review,
        }
    }
}

// AI review session types

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub note_id: Uuid,
    pub mode: SessionMode,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    /// `None` skips the question.
    pub answer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerSubmission>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionQuestionView {
    pub id: Uuid,
    pub question_type: QuestionType,
    pub question: String,
    pub status: QuestionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub note_id: Uuid,
    pub status: SessionStatus,
    pub mode: SessionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub questions: Vec<SessionQuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SessionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionResponse {
    pub fn from_model(model: &AiReviewSession) -> Self {
        let session = &model.session;
        Self {
            id: model.id,
            note_id: model.note_id,
            status: session.status(),
            mode: session.mode,
            difficulty: session.difficulty,
            questions: session
                .questions()
                .iter()
                .map(|q| SessionQuestionView {
                    id: q.id,
                    question_type: q.question_type,
                    question: q.question.clone(),
                    status: q.status,
                    answer: q.answer.clone(),
                    evaluation: q.evaluation,
                    ai_message: q.ai_message.clone(),
                })
                .collect(),
            result: session.result().copied(),
            error_message: session.error_message().map(|m| m.to_string()),
            requested_at: session.requested_at,
            questions_generated_at: session.questions_generated_at(),
            session_started_at: session.session_started_at(),
            completed_at: session.completed_at(),
        }
    }
}
