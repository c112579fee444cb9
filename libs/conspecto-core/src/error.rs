//! Error types for conspecto-core.

use thiserror::Error;

use crate::types::SessionStatus;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the scheduler on invalid input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("quality {0} is out of range (expected 0..=5)")]
    InvalidQuality(u8),
}

/// Errors raised by illegal session state machine transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("session is {actual:?}, expected {expected}")]
    WrongPhase {
        expected: &'static str,
        actual: SessionStatus,
    },

    #[error("session is already terminal ({0:?})")]
    AlreadyTerminal(SessionStatus),

    #[error("generator returned no questions")]
    NoQuestionsGenerated,

    #[error("unknown question {0}")]
    UnknownQuestion(uuid::Uuid),

    #[error("question {0} already has an answer recorded")]
    AnswerAlreadyRecorded(uuid::Uuid),

    #[error("question {0} is already resolved")]
    QuestionAlreadyResolved(uuid::Uuid),

    #[error("{0} question(s) still unresolved")]
    UnresolvedQuestions(usize),
}
