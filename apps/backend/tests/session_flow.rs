//! Session orchestration tests over the in-memory store and scripted
//! providers.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use common::{service, EmptyGenerator, FailingGenerator, InMemoryStore, ScriptedProvider, SlowProvider};
use conspecto_backend::error::ApiError;
use conspecto_backend::models::{
    AnswerSubmission, Evaluation, QuestionStatus, SessionMode, SessionStatus,
};

fn submissions(pairs: &[(Uuid, Option<&str>)]) -> Vec<AnswerSubmission> {
    pairs
        .iter()
        .map(|(id, answer)| AnswerSubmission {
            question_id: *id,
            answer: answer.map(|a| a.to_string()),
        })
        .collect()
}

#[tokio::test]
async fn full_session_flow_produces_expected_result() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(5));
    let svc = service(store.clone(), provider.clone());
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "SM-2 schedules reviews by ease factor.");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    assert_eq!(created.session.status(), SessionStatus::ReadyForReview);
    assert_eq!(created.session.questions().len(), 5);
    assert_eq!(provider.generate_calls.load(Ordering::SeqCst), 1);

    let started = svc.start(user_id, created.id).await.unwrap();
    assert_eq!(started.session.status(), SessionStatus::InProgress);

    // 3 correct, 1 incorrect, 1 skipped
    let ids: Vec<Uuid> = started.session.questions().iter().map(|q| q.id).collect();
    svc.submit_answers(
        user_id,
        created.id,
        submissions(&[
            (ids[0], Some("this is correct")),
            (ids[1], Some("also correct")),
            (ids[2], Some("correct again")),
            (ids[3], Some("wrong answer")),
            (ids[4], None),
        ]),
    )
    .await
    .unwrap();

    let completed = svc.evaluate(user_id, created.id).await.unwrap();
    assert_eq!(completed.session.status(), SessionStatus::Completed);

    let result = completed.session.result().expect("completed without result");
    assert_eq!(result.total_questions, 5);
    assert_eq!(result.correct_answers, 3);
    assert_eq!(result.skipped_answers, 1);

    // The skipped question was classified without a provider call.
    assert_eq!(provider.evaluate_calls.load(Ordering::SeqCst), 4);
    let skipped = &completed.session.questions()[4];
    assert_eq!(skipped.status, QuestionStatus::Skipped);
    assert_eq!(skipped.evaluation, Some(Evaluation::NotAnswered));

    // Timestamps are monotonic across the lifecycle.
    let s = &completed.session;
    assert!(s.questions_generated_at().unwrap() >= s.requested_at);
    assert!(s.session_started_at().unwrap() >= s.questions_generated_at().unwrap());
    assert!(s.completed_at().unwrap() >= s.session_started_at().unwrap());
}

#[tokio::test]
async fn empty_generation_fails_the_session() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(store.clone(), Arc::new(EmptyGenerator));
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let session = svc
        .request(user_id, note_id, SessionMode::SeparateQuestions, None)
        .await
        .unwrap();
    assert_eq!(session.session.status(), SessionStatus::Failed);
    assert!(session.session.error_message().is_some());
}

#[tokio::test]
async fn generator_error_fails_the_session() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(store.clone(), Arc::new(FailingGenerator));
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let session = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    assert_eq!(session.session.status(), SessionStatus::Failed);
    let message = session.session.error_message().unwrap();
    assert!(message.contains("generation failed"), "got: {message}");

    // Terminal: the failed session is still loadable and unchanged.
    let loaded = svc.get(user_id, session.id).await.unwrap();
    assert_eq!(loaded.session.status(), SessionStatus::Failed);
}

#[tokio::test]
async fn generation_timeout_fails_the_session() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(
        store.clone(),
        Arc::new(SlowProvider {
            delay: Duration::from_secs(5),
        }),
    );
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let session = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    assert_eq!(session.session.status(), SessionStatus::Failed);
    assert!(session
        .session
        .error_message()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn single_evaluation_failure_degrades_only_that_question() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(ScriptedProvider::failing_on(3, &["Question 1?"]));
    let svc = service(store.clone(), provider.clone());
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    svc.start(user_id, created.id).await.unwrap();
    let ids: Vec<Uuid> = created.session.questions().iter().map(|q| q.id).collect();
    svc.submit_answers(
        user_id,
        created.id,
        submissions(&[
            (ids[0], Some("correct")),
            (ids[1], Some("correct")),
            (ids[2], Some("correct")),
        ]),
    )
    .await
    .unwrap();

    let completed = svc.evaluate(user_id, created.id).await.unwrap();
    assert_eq!(completed.session.status(), SessionStatus::Completed);

    let questions = completed.session.questions();
    assert_eq!(questions[0].evaluation, Some(Evaluation::Correct));
    assert_eq!(questions[1].evaluation, Some(Evaluation::NotAnswered));
    assert!(questions[1].ai_message.as_deref().unwrap().contains("evaluation failed"));
    assert_eq!(questions[2].evaluation, Some(Evaluation::Correct));

    let result = completed.session.result().unwrap();
    assert_eq!(result.total_questions, 3);
    assert_eq!(result.correct_answers, 2);
    assert_eq!(result.skipped_answers, 1);
}

#[tokio::test]
async fn whole_step_failure_fails_the_session() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(ScriptedProvider::failing_on(
        2,
        &["Question 0?", "Question 1?"],
    ));
    let svc = service(store.clone(), provider);
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    svc.start(user_id, created.id).await.unwrap();
    let ids: Vec<Uuid> = created.session.questions().iter().map(|q| q.id).collect();
    svc.submit_answers(
        user_id,
        created.id,
        submissions(&[(ids[0], Some("a")), (ids[1], Some("b"))]),
    )
    .await
    .unwrap();

    let failed = svc.evaluate(user_id, created.id).await.unwrap();
    assert_eq!(failed.session.status(), SessionStatus::Failed);
    assert!(failed
        .session
        .error_message()
        .unwrap()
        .contains("provider unreachable"));

    // The question set and timestamps survive the failure, including a
    // round trip through the store.
    assert_eq!(failed.session.questions().len(), 2);
    assert!(failed.session.questions_generated_at().is_some());
    assert!(failed.session.session_started_at().is_some());
    let reloaded = svc.get(user_id, created.id).await.unwrap();
    assert_eq!(reloaded.session.questions().len(), 2);
    assert!(reloaded.session.questions_generated_at().is_some());
}

#[tokio::test]
async fn evaluation_runs_at_most_once_per_session() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(1));
    let svc = service(store.clone(), provider.clone());
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    svc.start(user_id, created.id).await.unwrap();
    let id = created.session.questions()[0].id;
    svc.submit_answers(user_id, created.id, submissions(&[(id, Some("correct"))]))
        .await
        .unwrap();

    svc.evaluate(user_id, created.id).await.unwrap();
    let calls_after_first = provider.evaluate_calls.load(Ordering::SeqCst);

    // A second evaluation attempt is refused and contacts no provider.
    let err = svc.evaluate(user_id, created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(provider.evaluate_calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn session_cannot_skip_forward() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(store.clone(), Arc::new(ScriptedProvider::new(2)));
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();

    // ready_for_review -> evaluating_answers directly is illegal.
    let err = svc.evaluate(user_id, created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    let loaded = svc.get(user_id, created.id).await.unwrap();
    assert_eq!(loaded.session.status(), SessionStatus::ReadyForReview);
}

#[tokio::test]
async fn answers_are_locked_once_evaluation_begins() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(store.clone(), Arc::new(ScriptedProvider::new(2)));
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    svc.start(user_id, created.id).await.unwrap();
    let ids: Vec<Uuid> = created.session.questions().iter().map(|q| q.id).collect();
    svc.submit_answers(user_id, created.id, submissions(&[(ids[0], Some("correct"))]))
        .await
        .unwrap();

    svc.evaluate(user_id, created.id).await.unwrap();

    let err = svc
        .submit_answers(user_id, created.id, submissions(&[(ids[1], Some("late"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn sessions_are_scoped_to_their_owner() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(store.clone(), Arc::new(ScriptedProvider::new(1)));
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let note_id = store.add_note(owner, "content");

    // A stranger cannot request a session against someone else's note.
    let err = svc
        .request(stranger, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let created = svc
        .request(owner, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    let err = svc.get(stranger, created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn request_against_missing_note_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let svc = service(store, Arc::new(ScriptedProvider::new(1)));

    let err = svc
        .request(Uuid::new_v4(), Uuid::new_v4(), SessionMode::MonoTest, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn get_is_side_effect_free() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(2));
    let svc = service(store.clone(), provider.clone());
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();

    for _ in 0..3 {
        let loaded = svc.get(user_id, created.id).await.unwrap();
        assert_eq!(loaded.session.status(), SessionStatus::ReadyForReview);
    }
    assert_eq!(provider.generate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unanswered_questions_are_skipped_at_evaluation() {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(3));
    let svc = service(store.clone(), provider.clone());
    let user_id = Uuid::new_v4();
    let note_id = store.add_note(user_id, "content");

    let created = svc
        .request(user_id, note_id, SessionMode::MonoTest, None)
        .await
        .unwrap();
    svc.start(user_id, created.id).await.unwrap();
    let ids: Vec<Uuid> = created.session.questions().iter().map(|q| q.id).collect();
    // Answer only the first question; leave the rest untouched.
    svc.submit_answers(user_id, created.id, submissions(&[(ids[0], Some("correct"))]))
        .await
        .unwrap();

    let completed = svc.evaluate(user_id, created.id).await.unwrap();
    assert_eq!(completed.session.status(), SessionStatus::Completed);
    assert_eq!(provider.evaluate_calls.load(Ordering::SeqCst), 1);

    let result = completed.session.result().unwrap();
    assert_eq!(result.total_questions, 3);
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.skipped_answers, 2);
}
