pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conspecto_core::Scheduler;

use crate::db::Database;
use crate::services::ai::OpenAiProvider;
use crate::services::session::{SessionService, SessionServiceConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub scheduler: Scheduler,
    pub sessions: Arc<SessionService>,
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Connect to database
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    tracing::info!("Connecting to database...");
    let db = Arc::new(Database::connect(&database_url).await?);

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    tracing::info!("Initializing AI provider...");
    let ai = Arc::new(OpenAiProvider::from_env()?);

    let sessions = Arc::new(SessionService::new(
        db.clone(),
        ai,
        SessionServiceConfig::from_env(),
    ));

    let state = AppState {
        db,
        scheduler: Scheduler::default(),
        sessions,
    };

    let app = build_router(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        // User routes
        .route("/api/users/status", get(routes::users::status))
        // Content routes
        .route("/api/notes", post(routes::notes::create_note))
        .route("/api/folders", post(routes::notes::create_folder))
        .route(
            "/api/questions",
            post(routes::questions::create).get(routes::questions::list),
        )
        // Manual review routes
        .route("/api/notes/{id}/review", post(routes::review::review_note))
        .route("/api/folders/{id}/review", post(routes::review::review_folder))
        .route(
            "/api/questions/{id}/review",
            post(routes::review::review_question),
        )
        // AI review session routes
        .route("/api/ai-review", post(routes::sessions::create))
        .route("/api/ai-review/{id}", get(routes::sessions::get))
        .route("/api/ai-review/{id}/start", post(routes::sessions::start))
        .route(
            "/api/ai-review/{id}/answers",
            post(routes::sessions::submit_answers),
        )
        .route(
            "/api/ai-review/{id}/evaluate",
            post(routes::sessions::evaluate),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/users/register", post(routes::users::register))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
