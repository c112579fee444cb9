//! AI review session state machine.
//!
//! One session is one AI-driven quiz over a note: questions are
//! generated, the user answers or skips them, each answer is evaluated,
//! and a result is aggregated. Each phase carries only the data valid
//! in that phase, so a completed session always has a result and a
//! pending session cannot hold questions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TransitionError;
use crate::types::{
    Difficulty, Evaluation, GeneratedQuestion, QuestionStatus, SessionMode, SessionResult,
    SessionStatus,
};

/// Phase-specific session data.
///
/// Timestamps live in the variant that introduces them, so each is set
/// exactly once and the `requested <= generated <= started <= completed`
/// ordering holds by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Created; waiting on question generation.
    Pending,
    /// Questions generated; waiting for the user to begin.
    ReadyForReview {
        questions: Vec<GeneratedQuestion>,
        generated_at: DateTime<Utc>,
    },
    /// User is answering.
    InProgress {
        questions: Vec<GeneratedQuestion>,
        generated_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },
    /// Answers locked; evaluations being collected.
    EvaluatingAnswers {
        questions: Vec<GeneratedQuestion>,
        generated_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },
    /// Terminal: every question resolved, result snapshot taken.
    Completed {
        questions: Vec<GeneratedQuestion>,
        generated_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        result: SessionResult,
    },
    /// Terminal: an unrecoverable error stopped the session. Keeps
    /// whatever had been generated before the failure.
    Failed {
        questions: Vec<GeneratedQuestion>,
        generated_at: Option<DateTime<Utc>>,
        started_at: Option<DateTime<Utc>>,
        error_message: String,
    },
}

/// One AI review session.
///
/// Identity (session/user/note ids) is the caller's concern; this type
/// tracks mode, difficulty, and phase. Mutation goes through the
/// transition methods, which refuse regressions and forward skips.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSession {
    pub mode: SessionMode,
    pub difficulty: Option<Difficulty>,
    pub requested_at: DateTime<Utc>,
    pub phase: Phase,
}

impl ReviewSession {
    /// Create a session in `pending`, stamped with `requested_at`.
    pub fn new(mode: SessionMode, difficulty: Option<Difficulty>, requested_at: DateTime<Utc>) -> Self {
        Self {
            mode,
            difficulty,
            requested_at,
            phase: Phase::Pending,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match &self.phase {
            Phase::Pending => SessionStatus::Pending,
            Phase::ReadyForReview { .. } => SessionStatus::ReadyForReview,
            Phase::InProgress { .. } => SessionStatus::InProgress,
            Phase::EvaluatingAnswers { .. } => SessionStatus::EvaluatingAnswers,
            Phase::Completed { .. } => SessionStatus::Completed,
            Phase::Failed { .. } => SessionStatus::Failed,
        }
    }

    /// Questions, once generated. The set is fixed from generation on;
    /// a failed session keeps whatever had been generated.
    pub fn questions(&self) -> &[GeneratedQuestion] {
        match &self.phase {
            Phase::ReadyForReview { questions, .. }
            | Phase::InProgress { questions, .. }
            | Phase::EvaluatingAnswers { questions, .. }
            | Phase::Completed { questions, .. }
            | Phase::Failed { questions, .. } => questions,
            Phase::Pending => &[],
        }
    }

    pub fn result(&self) -> Option<&SessionResult> {
        match &self.phase {
            Phase::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { error_message, .. } => Some(error_message),
            _ => None,
        }
    }

    pub fn questions_generated_at(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            Phase::ReadyForReview { generated_at, .. }
            | Phase::InProgress { generated_at, .. }
            | Phase::EvaluatingAnswers { generated_at, .. }
            | Phase::Completed { generated_at, .. } => Some(*generated_at),
            Phase::Failed { generated_at, .. } => *generated_at,
            Phase::Pending => None,
        }
    }

    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            Phase::InProgress { started_at, .. }
            | Phase::EvaluatingAnswers { started_at, .. }
            | Phase::Completed { started_at, .. } => Some(*started_at),
            Phase::Failed { started_at, .. } => *started_at,
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            Phase::Completed { completed_at, .. } => Some(*completed_at),
            _ => None,
        }
    }

    /// `pending` -> `ready_for_review`.
    ///
    /// The question set is fixed from here on. An empty set is refused;
    /// the caller maps that to `fail` per the generation contract.
    pub fn questions_generated(
        &mut self,
        questions: Vec<GeneratedQuestion>,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match self.phase {
            Phase::Pending => {
                if questions.is_empty() {
                    return Err(TransitionError::NoQuestionsGenerated);
                }
                self.phase = Phase::ReadyForReview {
                    questions,
                    generated_at: at,
                };
                Ok(())
            }
            _ => Err(self.wrong_phase("pending")),
        }
    }

    /// `ready_for_review` -> `in_progress`.
    pub fn begin(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        match std::mem::replace(&mut self.phase, Phase::Pending) {
            Phase::ReadyForReview {
                questions,
                generated_at,
            } => {
                self.phase = Phase::InProgress {
                    questions,
                    generated_at,
                    started_at: at,
                };
                Ok(())
            }
            other => {
                self.phase = other;
                Err(self.wrong_phase("ready_for_review"))
            }
        }
    }

    /// Record an answer (or an explicit skip) while `in_progress`.
    ///
    /// Refused once evaluation has begun; answers are locked then.
    pub fn record_answer(
        &mut self,
        question_id: Uuid,
        answer: Option<String>,
    ) -> Result<(), TransitionError> {
        let Phase::InProgress { questions, .. } = &mut self.phase else {
            return Err(self.wrong_phase("in_progress"));
        };
        let question = questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(TransitionError::UnknownQuestion(question_id))?;
        if question.status != QuestionStatus::Generated {
            return Err(TransitionError::AnswerAlreadyRecorded(question_id));
        }
        match answer {
            Some(text) => {
                question.answer = Some(text);
                question.status = QuestionStatus::Answered;
            }
            None => question.status = QuestionStatus::Skipped,
        }
        Ok(())
    }

    /// `in_progress` -> `evaluating_answers`, locking answers.
    ///
    /// Questions never answered are reclassified as skipped here, so
    /// evaluation sees only `answered` and `skipped` questions.
    pub fn begin_evaluation(&mut self) -> Result<(), TransitionError> {
        match std::mem::replace(&mut self.phase, Phase::Pending) {
            Phase::InProgress {
                mut questions,
                generated_at,
                started_at,
            } => {
                for question in &mut questions {
                    if question.status == QuestionStatus::Generated {
                        question.status = QuestionStatus::Skipped;
                    }
                }
                self.phase = Phase::EvaluatingAnswers {
                    questions,
                    generated_at,
                    started_at,
                };
                Ok(())
            }
            other => {
                self.phase = other;
                Err(self.wrong_phase("in_progress"))
            }
        }
    }

    /// Flag a question as being evaluated by the provider.
    pub fn mark_evaluating(&mut self, question_id: Uuid) -> Result<(), TransitionError> {
        let Phase::EvaluatingAnswers { questions, .. } = &mut self.phase else {
            return Err(self.wrong_phase("evaluating_answers"));
        };
        let question = questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(TransitionError::UnknownQuestion(question_id))?;
        if question.is_resolved() {
            return Err(TransitionError::QuestionAlreadyResolved(question_id));
        }
        if question.status == QuestionStatus::Answered {
            question.status = QuestionStatus::Evaluating;
        }
        Ok(())
    }

    /// Assign an evaluation outcome to one question.
    ///
    /// Answered questions return to `answered` with the evaluation set;
    /// skipped questions keep their status. At most one resolution per
    /// question.
    pub fn resolve_question(
        &mut self,
        question_id: Uuid,
        evaluation: Evaluation,
        ai_message: Option<String>,
    ) -> Result<(), TransitionError> {
        let Phase::EvaluatingAnswers { questions, .. } = &mut self.phase else {
            return Err(self.wrong_phase("evaluating_answers"));
        };
        let question = questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(TransitionError::UnknownQuestion(question_id))?;
        if question.is_resolved() {
            return Err(TransitionError::QuestionAlreadyResolved(question_id));
        }
        question.evaluation = Some(evaluation);
        question.ai_message = ai_message;
        if question.status == QuestionStatus::Evaluating {
            question.status = QuestionStatus::Answered;
        }
        Ok(())
    }

    /// `evaluating_answers` -> `completed`, snapshotting the result.
    ///
    /// Refused while any question is unresolved.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        match std::mem::replace(&mut self.phase, Phase::Pending) {
            Phase::EvaluatingAnswers {
                questions,
                generated_at,
                started_at,
            } => {
                let unresolved = questions.iter().filter(|q| !q.is_resolved()).count();
                if unresolved > 0 {
                    self.phase = Phase::EvaluatingAnswers {
                        questions,
                        generated_at,
                        started_at,
                    };
                    return Err(TransitionError::UnresolvedQuestions(unresolved));
                }
                let result = aggregate_result(&questions);
                self.phase = Phase::Completed {
                    questions,
                    generated_at,
                    started_at,
                    completed_at: at,
                    result,
                };
                Ok(())
            }
            other => {
                self.phase = other;
                Err(self.wrong_phase("evaluating_answers"))
            }
        }
    }

    /// Transition any non-terminal session to `failed`, carrying over
    /// the questions and timestamps accumulated so far.
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<(), TransitionError> {
        let (questions, generated_at, started_at) =
            match std::mem::replace(&mut self.phase, Phase::Pending) {
                Phase::Pending => (Vec::new(), None, None),
                Phase::ReadyForReview {
                    questions,
                    generated_at,
                } => (questions, Some(generated_at), None),
                Phase::InProgress {
                    questions,
                    generated_at,
                    started_at,
                }
                | Phase::EvaluatingAnswers {
                    questions,
                    generated_at,
                    started_at,
                } => (questions, Some(generated_at), Some(started_at)),
                other => {
                    self.phase = other;
                    return Err(TransitionError::AlreadyTerminal(self.status()));
                }
            };
        self.phase = Phase::Failed {
            questions,
            generated_at,
            started_at,
            error_message: error_message.into(),
        };
        Ok(())
    }

    fn wrong_phase(&self, expected: &'static str) -> TransitionError {
        TransitionError::WrongPhase {
            expected,
            actual: self.status(),
        }
    }
}

/// Aggregate a result over a fully resolved question set.
///
/// Each question is counted at most once: correct if evaluated
/// `correct`, skipped if it was skipped or classified `not_answered`.
pub fn aggregate_result(questions: &[GeneratedQuestion]) -> SessionResult {
    let correct_answers = questions
        .iter()
        .filter(|q| q.evaluation == Some(Evaluation::Correct))
        .count();
    let skipped_answers = questions
        .iter()
        .filter(|q| {
            q.status == QuestionStatus::Skipped || q.evaluation == Some(Evaluation::NotAnswered)
        })
        .count();
    SessionResult {
        total_questions: questions.len(),
        correct_answers,
        skipped_answers,
    }
}
