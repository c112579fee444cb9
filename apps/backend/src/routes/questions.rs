//! Drill question endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::{CreateQuestionRequest, QuestionListQuery, QuestionResponse};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/questions
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<Json<QuestionResponse>> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::Validation("question must not be empty".to_string()));
    }

    if let Some(note_id) = payload.note_id {
        let note = state
            .db
            .get_note(note_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Note {} not found", note_id)))?;
        if note.user_id != auth.user_id {
            return Err(ApiError::Validation("note is not accessible".to_string()));
        }
    }

    let row = state
        .db
        .create_question(auth.user_id, payload.note_id, &payload.question, &payload.answer)
        .await?;

    Ok(Json(QuestionResponse::from_row(&row)))
}

/// GET /api/questions
/// Lists the user's questions, optionally scoped to a note or folder.
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<QuestionListQuery>,
) -> Result<Json<Vec<QuestionResponse>>> {
    let rows = match (query.note_id, query.folder_id) {
        (Some(_), Some(_)) => {
            return Err(ApiError::Validation(
                "note_id and folder_id are mutually exclusive".to_string(),
            ))
        }
        (Some(note_id), None) => state.db.get_questions_by_note(auth.user_id, note_id).await?,
        (None, Some(folder_id)) => {
            state
                .db
                .get_questions_by_folder(auth.user_id, folder_id)
                .await?
        }
        (None, None) => state.db.get_questions_by_user(auth.user_id).await?,
    };

    Ok(Json(rows.iter().map(QuestionResponse::from_row).collect()))
}
