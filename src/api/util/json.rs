use axum::Json;
use tracing::error;

use crate::core::client::store_error::StoreError;
use crate::errors::{query_error, AppError};

/// Map a store Result<T> into Json<T>, or the error envelope on failure.
pub fn to_json<T: serde::Serialize>(result: Result<T, StoreError>) -> Result<Json<T>, AppError> {
    match result {
        Ok(value) => Ok(Json(value)),
        Err(err) => {
            error!(error = %err, "Store query failed");
            Err(query_error(err))
        }
    }
}
