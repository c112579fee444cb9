//! Note and folder endpoints

use axum::{extract::State, Extension, Json};

use crate::error::{ApiError, Result};
use crate::models::{
    CreateFolderRequest, CreateNoteRequest, FolderResponse, NoteResponse,
};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<Json<NoteResponse>> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }

    if let Some(folder_id) = payload.folder_id {
        let folder = state
            .db
            .get_folder(folder_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Folder {} not found", folder_id)))?;
        if folder.user_id != auth.user_id {
            return Err(ApiError::Validation("folder is not accessible".to_string()));
        }
    }

    let note = state
        .db
        .create_note(auth.user_id, payload.folder_id, &payload.title, &payload.content)
        .await?;

    Ok(Json(NoteResponse {
        id: note.id,
        folder_id: note.folder_id,
        title: note.title,
        next_review: note.next_review,
    }))
}

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateFolderRequest>,
) -> Result<Json<FolderResponse>> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }

    let folder = state.db.create_folder(auth.user_id, &payload.name).await?;

    Ok(Json(FolderResponse {
        id: folder.id,
        name: folder.name,
        next_review: folder.next_review,
    }))
}
