use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    QueryExecution(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Helper for mapping a store failure into the per-request execution error
pub fn query_error<E: ToString>(err: E) -> AppError {
    AppError::QueryExecution(err.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::QueryExecution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // The dashboard reads `error` from every failed response.
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
