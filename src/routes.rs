use axum::{extract::Request, http::Uri, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::errors::AppError;

/// Build the main application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Dashboard API
        .nest("/api", crate::api::routes::metrics_routes::metrics_routes())
        // Fallback handler for 404
        .fallback(handler_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            tracing::info_span!(
                "http_request",
                request_id = %Uuid::new_v4(),
                method = %req.method(),
                path = %req.uri().path(),
            )
        }))
        .layer(CorsLayer::permissive())
}

// Handler for health check
async fn health_check() -> &'static str {
    "OK"
}

// Handler for 404 Not Found
async fn handler_404(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
