//! AI review session endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CreateSessionRequest, SessionResponse, SubmitAnswersRequest};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/ai-review
/// Creates a session and generates its questions.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>> {
    let model = state
        .sessions
        .request(auth.user_id, payload.note_id, payload.mode, payload.difficulty)
        .await?;

    Ok(Json(SessionResponse::from_model(&model)))
}

/// GET /api/ai-review/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let model = state.sessions.get(auth.user_id, session_id).await?;
    Ok(Json(SessionResponse::from_model(&model)))
}

/// POST /api/ai-review/{id}/start
pub async fn start(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let model = state.sessions.start(auth.user_id, session_id).await?;
    Ok(Json(SessionResponse::from_model(&model)))
}

/// POST /api/ai-review/{id}/answers
pub async fn submit_answers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Json<SessionResponse>> {
    let model = state
        .sessions
        .submit_answers(auth.user_id, session_id, payload.answers)
        .await?;
    Ok(Json(SessionResponse::from_model(&model)))
}

/// POST /api/ai-review/{id}/evaluate
/// Locks answers, runs evaluation, and completes the session.
pub async fn evaluate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let model = state.sessions.evaluate(auth.user_id, session_id).await?;
    Ok(Json(SessionResponse::from_model(&model)))
}
