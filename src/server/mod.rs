//! HTTP API.

mod error;
mod form;
mod handlers;

pub use error::ApiError;
pub use form::FormFields;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::ServerConfig;
use crate::services::RagPipeline;

pub type AppState = Arc<RagPipeline>;

/// Build the router with every endpoint.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/upload_dataset", post(handlers::upload_dataset))
        .route("/train_dataset", post(handlers::train_dataset))
        .route("/query", post(handlers::query))
        .route("/chat_llm", post(handlers::chat_llm))
        .route("/summarize_content", post(handlers::summarize_content))
        .route("/list_datasets", get(handlers::list_datasets))
        .route("/list_groq_models", get(handlers::list_groq_models))
        .route("/list_gemini_models", get(handlers::list_gemini_models))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(
    pipeline: RagPipeline,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(Arc::new(pipeline), config.max_body_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server shut down");
    Ok(())
}
