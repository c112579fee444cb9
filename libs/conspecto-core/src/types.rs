//! Core types for note review and AI review sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Self-rated recall score for a review, 0 (blackout) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;

    /// Validate a raw rating.
    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(CoreError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// One entry in a reviewable entity's history. Immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewHistoryItem {
    pub date: DateTime<Utc>,
    pub quality: Quality,
}

/// Spaced-repetition state carried by a note, folder, or question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    /// Count of consecutive successful reviews.
    pub repetition: u32,
    /// Days until the next review.
    pub interval_days: u32,
    pub ease_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    /// Append-only, chronological.
    pub history: Vec<ReviewHistoryItem>,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            repetition: 0,
            interval_days: 0,
            ease_factor: 2.5,
            next_review: None,
            last_review: None,
            history: Vec::new(),
        }
    }
}

/// How an AI review session is conducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One combined test over the whole note.
    MonoTest,
    /// Independently tracked questions.
    SeparateQuestions,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonoTest => "mono_test",
            Self::SeparateQuestions => "separate_questions",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mono_test" => Some(Self::MonoTest),
            "separate_questions" => Some(Self::SeparateQuestions),
            _ => None,
        }
    }
}

/// Requested difficulty for generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Shape of a generated question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    OpenEnded,
    MultipleChoice,
    TrueFalse,
}

/// Per-question answering status within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Generated,
    Answered,
    Skipped,
    Evaluating,
}

/// Outcome assigned to a question after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Correct,
    Incorrect,
    NotAnswered,
}

/// A question generated for one AI review session.
///
/// Owned exclusively by its parent session; never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub id: Uuid,
    pub question_type: QuestionType,
    pub question: String,
    /// The user's submitted answer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub status: QuestionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    /// Feedback (or failure note) from the evaluation step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_message: Option<String>,
}

impl GeneratedQuestion {
    /// A freshly generated, unanswered question.
    pub fn new(question_type: QuestionType, question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_type,
            question: question.into(),
            answer: None,
            status: QuestionStatus::Generated,
            evaluation: None,
            ai_message: None,
        }
    }

    /// A question is resolved once its evaluation has been assigned.
    pub fn is_resolved(&self) -> bool {
        self.evaluation.is_some()
    }
}

/// Aggregated outcome of a completed session. Computed once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub total_questions: usize,
    pub correct_answers: usize,
    pub skipped_answers: usize,
}

/// Coarse session status, as stored and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    ReadyForReview,
    InProgress,
    EvaluatingAnswers,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ReadyForReview => "ready_for_review",
            Self::InProgress => "in_progress",
            Self::EvaluatingAnswers => "evaluating_answers",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "ready_for_review" => Some(Self::ReadyForReview),
            "in_progress" => Some(Self::InProgress),
            "evaluating_answers" => Some(Self::EvaluatingAnswers),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal sessions never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
