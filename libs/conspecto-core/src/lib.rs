//! Core review library shared by the Conspecto backend.
//!
//! Provides:
//! - SM-2 spaced repetition scheduler with explicit configuration
//! - AI review session state machine (typed phases, one-way transitions)
//! - Result aggregation for completed sessions
//! - Shared types (ReviewState, Quality, GeneratedQuestion, etc.)

pub mod error;
pub mod scheduler;
pub mod session;
pub mod types;

pub use error::{CoreError, Result, TransitionError};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use session::{aggregate_result, Phase, ReviewSession};
pub use types::{
    Difficulty, Evaluation, GeneratedQuestion, Quality, QuestionStatus, QuestionType,
    ReviewHistoryItem, ReviewState, SessionMode, SessionResult, SessionStatus,
};
