//! Manual spaced-repetition review endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{HasReviewState, Quality, SubmitReviewRequest, SubmitReviewResponse};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/notes/{id}/review
pub async fn review_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(note_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<SubmitReviewResponse>> {
    let quality = Quality::new(payload.quality)?;

    let note = state
        .db
        .get_note(note_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Note {} not found", note_id)))?;
    if note.user_id != auth.user_id {
        return Err(ApiError::NotFound(format!("Note {} not found", note_id)));
    }

    let next = state
        .scheduler
        .schedule(&note.to_review_state(), quality, Utc::now());
    state.db.update_note_review_state(note_id, &next).await?;

    Ok(Json(SubmitReviewResponse::from_state(&next)))
}

/// POST /api/folders/{id}/review
pub async fn review_folder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(folder_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<SubmitReviewResponse>> {
    let quality = Quality::new(payload.quality)?;

    let folder = state
        .db
        .get_folder(folder_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Folder {} not found", folder_id)))?;
    if folder.user_id != auth.user_id {
        return Err(ApiError::NotFound(format!("Folder {} not found", folder_id)));
    }

    let next = state
        .scheduler
        .schedule(&folder.to_review_state(), quality, Utc::now());
    state.db.update_folder_review_state(folder_id, &next).await?;

    Ok(Json(SubmitReviewResponse::from_state(&next)))
}

/// POST /api/questions/{id}/review
pub async fn review_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<SubmitReviewResponse>> {
    let quality = Quality::new(payload.quality)?;

    let question = state
        .db
        .get_question(question_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Question {} not found", question_id)))?;
    if question.user_id != auth.user_id {
        return Err(ApiError::NotFound(format!("Question {} not found", question_id)));
    }

    let next = state
        .scheduler
        .schedule(&question.to_review_state(), quality, Utc::now());
    state
        .db
        .update_question_review_state(question_id, &next)
        .await?;

    Ok(Json(SubmitReviewResponse::from_state(&next)))
}
