//! PostgreSQL database operations

use sqlx::types::Json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === User Repository ===

    /// Create a new user with generated token
    pub async fn create_user(&self, email: Option<&str>) -> Result<User> {
        let token = Uuid::new_v4().to_string();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (token, email)
            VALUES ($1, $2)
            RETURNING id, token, email, created_at, last_seen_at
            "#,
        )
        .bind(&token)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by token
    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, token, email, created_at, last_seen_at
            FROM users
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update user last_seen_at timestamp
    pub async fn update_last_seen(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_seen_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === Note Repository ===

    /// Create a note with fresh scheduling state
    pub async fn create_note(
        &self,
        user_id: Uuid,
        folder_id: Option<Uuid>,
        title: &str,
        content: &str,
    ) -> Result<DbNote> {
        let note = sqlx::query_as::<_, DbNote>(
            r#"
            INSERT INTO notes (user_id, folder_id, title, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, folder_id, title, content,
                      repetition, interval_days, ease_factor, next_review, last_review, history,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(folder_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(note)
    }

    /// Get note by ID
    pub async fn get_note(&self, note_id: Uuid) -> Result<Option<DbNote>> {
        let note = sqlx::query_as::<_, DbNote>(
            r#"
            SELECT id, user_id, folder_id, title, content,
                   repetition, interval_days, ease_factor, next_review, last_review, history,
                   created_at, updated_at
            FROM notes
            WHERE id = $1
            "#,
        )
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(note)
    }

    /// Persist a note's scheduling state after a review
    pub async fn update_note_review_state(&self, note_id: Uuid, state: &ReviewState) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notes
            SET repetition = $2, interval_days = $3, ease_factor = $4,
                next_review = $5, last_review = $6, history = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(note_id)
        .bind(state.repetition as i32)
        .bind(state.interval_days as i32)
        .bind(state.ease_factor)
        .bind(state.next_review)
        .bind(state.last_review)
        .bind(Json(&state.history))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === Folder Repository ===

    /// Create a folder
    pub async fn create_folder(&self, user_id: Uuid, name: &str) -> Result<DbFolder> {
        let folder = sqlx::query_as::<_, DbFolder>(
            r#"
            INSERT INTO folders (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name,
                      repetition, interval_days, ease_factor, next_review, last_review, history,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(folder)
    }

    /// Get folder by ID
    pub async fn get_folder(&self, folder_id: Uuid) -> Result<Option<DbFolder>> {
        let folder = sqlx::query_as::<_, DbFolder>(
            r#"
            SELECT id, user_id, name,
                   repetition, interval_days, ease_factor, next_review, last_review, history,
                   created_at, updated_at
            FROM folders
            WHERE id = $1
            "#,
        )
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(folder)
    }

    /// Persist a folder's scheduling state after a review
    pub async fn update_folder_review_state(
        &self,
        folder_id: Uuid,
        state: &ReviewState,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE folders
            SET repetition = $2, interval_days = $3, ease_factor = $4,
                next_review = $5, last_review = $6, history = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(folder_id)
        .bind(state.repetition as i32)
        .bind(state.interval_days as i32)
        .bind(state.ease_factor)
        .bind(state.next_review)
        .bind(state.last_review)
        .bind(Json(&state.history))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === Question Repository ===

    /// Create a drill question
    pub async fn create_question(
        &self,
        user_id: Uuid,
        note_id: Option<Uuid>,
        question: &str,
        answer: &str,
    ) -> Result<DbQuestion> {
        let row = sqlx::query_as::<_, DbQuestion>(
            r#"
            INSERT INTO questions (user_id, note_id, question, answer)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, note_id, question, answer,
                      repetition, interval_days, ease_factor, next_review, last_review, history,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(note_id)
        .bind(question)
        .bind(answer)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Get question by ID
    pub async fn get_question(&self, question_id: Uuid) -> Result<Option<DbQuestion>> {
        let row = sqlx::query_as::<_, DbQuestion>(
            r#"
            SELECT id, user_id, note_id, question, answer,
                   repetition, interval_days, ease_factor, next_review, last_review, history,
                   created_at, updated_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Get all questions owned by a user
    pub async fn get_questions_by_user(&self, user_id: Uuid) -> Result<Vec<DbQuestion>> {
        let rows = sqlx::query_as::<_, DbQuestion>(
            r#"
            SELECT id, user_id, note_id, question, answer,
                   repetition, interval_days, ease_factor, next_review, last_review, history,
                   created_at, updated_at
            FROM questions
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Get all questions tied to a note
    pub async fn get_questions_by_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<DbQuestion>> {
        let rows = sqlx::query_as::<_, DbQuestion>(
            r#"
            SELECT id, user_id, note_id, question, answer,
                   repetition, interval_days, ease_factor, next_review, last_review, history,
                   created_at, updated_at
            FROM questions
            WHERE user_id = $1 AND note_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Get all questions whose note lives in a folder
    pub async fn get_questions_by_folder(
        &self,
        user_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Vec<DbQuestion>> {
        let rows = sqlx::query_as::<_, DbQuestion>(
            r#"
            SELECT q.id, q.user_id, q.note_id, q.question, q.answer,
                   q.repetition, q.interval_days, q.ease_factor, q.next_review, q.last_review,
                   q.history, q.created_at, q.updated_at
            FROM questions q
            JOIN notes n ON n.id = q.note_id
            WHERE q.user_id = $1 AND n.folder_id = $2
            ORDER BY q.created_at
            "#,
        )
        .bind(user_id)
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Persist a question's scheduling state after a review
    pub async fn update_question_review_state(
        &self,
        question_id: Uuid,
        state: &ReviewState,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE questions
            SET repetition = $2, interval_days = $3, ease_factor = $4,
                next_review = $5, last_review = $6, history = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .bind(state.repetition as i32)
        .bind(state.interval_days as i32)
        .bind(state.ease_factor)
        .bind(state.next_review)
        .bind(state.last_review)
        .bind(Json(&state.history))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === AI Review Session Repository ===

    /// Insert a freshly created session row
    pub async fn insert_session(&self, row: &DbAiReviewSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_review_sessions
                (id, user_id, note_id, status, mode, difficulty, questions, result,
                 error_message, requested_at, questions_generated_at, session_started_at,
                 completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.note_id)
        .bind(&row.status)
        .bind(&row.mode)
        .bind(&row.difficulty)
        .bind(&row.questions)
        .bind(&row.result)
        .bind(&row.error_message)
        .bind(row.requested_at)
        .bind(row.questions_generated_at)
        .bind(row.session_started_at)
        .bind(row.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a session row by ID
    pub async fn load_session(&self, session_id: Uuid) -> Result<Option<DbAiReviewSession>> {
        let row = sqlx::query_as::<_, DbAiReviewSession>(
            r#"
            SELECT id, user_id, note_id, status, mode, difficulty, questions, result,
                   error_message, requested_at, questions_generated_at, session_started_at,
                   completed_at
            FROM ai_review_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Overwrite a session row with its current state
    pub async fn save_session(&self, row: &DbAiReviewSession) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ai_review_sessions
            SET status = $2, questions = $3, result = $4, error_message = $5,
                questions_generated_at = $6, session_started_at = $7, completed_at = $8
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(&row.status)
        .bind(&row.questions)
        .bind(&row.result)
        .bind(&row.error_message)
        .bind(row.questions_generated_at)
        .bind(row.session_started_at)
        .bind(row.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
